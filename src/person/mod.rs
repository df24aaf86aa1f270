//! People who pay for receipts and own the items on them.

mod core;
mod endpoints;

pub use core::{
    Person, PersonForm, create_person, create_person_table, get_all_persons, get_person,
    get_persons_flagged_owner, get_persons_flagged_payer,
};
pub use endpoints::{
    create_person_endpoint, delete_person_endpoint, get_person_endpoint, get_persons_endpoint,
    update_person_endpoint,
};

use shared::{
    domain::Applicant,
    protocol::{applicants_delete_route, applicants_route},
};

use super::{delete_one, fetch_all, upsert_one, Endpoints, ListRoute};
use crate::{pipeline::ValidatedDispatcher, store::Action};

static APPLICANTS: Endpoints<Applicant> = Endpoints {
    entity: "applicants",
    list: ListRoute::Global(applicants_route),
    upsert: applicants_route,
    delete: applicants_delete_route,
    wrap: Action::Applicants,
    flatten: &[],
};

pub fn fetch_applicants() -> ValidatedDispatcher {
    fetch_all("fetch_applicants", "Fetch applicants", &APPLICANTS)
}

pub fn upsert_applicant() -> ValidatedDispatcher {
    upsert_one("upsert_applicant", "Add/update applicant", &APPLICANTS)
}

pub fn delete_applicant() -> ValidatedDispatcher {
    delete_one("delete_applicant", "Delete applicant", &APPLICANTS)
}

use shared::{
    domain::ContractTemplate,
    protocol::{
        contract_templates_delete_route, contract_templates_route, session_contract_templates_route,
    },
};

use super::{delete_one, fetch_all, upsert_one, Endpoints, ListRoute};
use crate::{flatten::FlattenId, pipeline::ValidatedDispatcher, store::Action};

static CONTRACT_TEMPLATES: Endpoints<ContractTemplate> = Endpoints {
    entity: "contract templates",
    list: ListRoute::PerSession(session_contract_templates_route),
    upsert: contract_templates_route,
    delete: contract_templates_delete_route,
    wrap: Action::ContractTemplates,
    flatten: &[FlattenId::new("session", "session_id")],
};

pub fn fetch_contract_templates() -> ValidatedDispatcher {
    fetch_all(
        "fetch_contract_templates",
        "Fetch contract templates of the active session",
        &CONTRACT_TEMPLATES,
    )
}

pub fn upsert_contract_template() -> ValidatedDispatcher {
    upsert_one(
        "upsert_contract_template",
        "Add/update contract template",
        &CONTRACT_TEMPLATES,
    )
}

pub fn delete_contract_template() -> ValidatedDispatcher {
    delete_one(
        "delete_contract_template",
        "Delete contract template",
        &CONTRACT_TEMPLATES,
    )
}

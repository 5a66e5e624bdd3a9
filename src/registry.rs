use tracing::debug;

use crate::models::{Boards, CompanyRegistry};

/// Effective registry: union of both sources per provider. On a company-name
/// collision the curated board id is kept and the discovered one ignored.
pub fn merge_registries(
    curated: &CompanyRegistry,
    discovered: &CompanyRegistry,
) -> CompanyRegistry {
    let mut merged = curated.clone();
    for (provider, boards) in discovered {
        let target = merged.entry(provider.clone()).or_default();
        for (company, board_id) in boards {
            match target.get(company) {
                Some(existing) if existing != board_id => debug!(
                    "{}: keeping curated board '{}' for {} over discovered '{}'",
                    provider, existing, company, board_id
                ),
                Some(_) => {}
                None => {
                    target.insert(company.clone(), board_id.clone());
                }
            }
        }
    }
    merged
}

pub fn boards_for<'a>(registry: &'a CompanyRegistry, provider: &str) -> Option<&'a Boards> {
    registry.get(provider)
}

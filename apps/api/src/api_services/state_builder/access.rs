use std::sync::Arc;

use hourglass_application::{IdentityProvider, PlanRepository, TeamMembershipRepository};
use hourglass_core::AppResult;
use hourglass_infrastructure::{
    HttpIdentityProvider, InMemoryAccessDirectory, PostgresAccessRepository,
};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, IdentityProviderConfig};
use crate::dev_seed;

pub(super) struct AccessPorts {
    pub(super) plans: Arc<dyn PlanRepository>,
    pub(super) memberships: Arc<dyn TeamMembershipRepository>,
    pub(super) identity_provider: Arc<dyn IdentityProvider>,
}

pub(super) async fn build_access_ports(
    pool: Option<&PgPool>,
    config: &ApiConfig,
) -> AppResult<AccessPorts> {
    let directory = Arc::new(InMemoryAccessDirectory::new());

    let identity_provider: Arc<dyn IdentityProvider> = match &config.identity_provider {
        IdentityProviderConfig::Hosted { auth_url, anon_key } => {
            info!(%auth_url, "using hosted identity provider");
            Arc::new(HttpIdentityProvider::new(
                reqwest::Client::new(),
                auth_url,
                anon_key.as_str(),
            )?)
        }
        IdentityProviderConfig::Development => {
            warn!("using development identity provider with seeded tokens");
            dev_seed::seed_directory(&directory).await;
            directory.clone()
        }
    };

    let access_repository =
        pool.map(|pool| Arc::new(PostgresAccessRepository::new(pool.clone())));
    let plans: Arc<dyn PlanRepository> = match &access_repository {
        Some(repository) => repository.clone(),
        None => directory.clone(),
    };
    let memberships: Arc<dyn TeamMembershipRepository> = match access_repository {
        Some(repository) => repository,
        None => directory,
    };

    Ok(AccessPorts {
        plans,
        memberships,
        identity_provider,
    })
}

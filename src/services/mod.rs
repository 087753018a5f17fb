//! Business logic services

pub mod catalog;
pub mod lending;
pub mod offers;

use chrono::{NaiveDate, Utc};

use crate::{config::LendingConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
    pub offers: offers::OffersService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, lending_config: LendingConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            lending: lending::LendingService::new(repository.clone(), lending_config),
            offers: offers::OffersService::new(repository.clone()),
            repository,
        }
    }

    /// Check database connectivity
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.repository.ping().await
    }
}

/// Calendar date used for due dates, overdue checks and coupon windows
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

use std::sync::Arc;

use crate::dto::fleet_dto::{AverageDistanceResponse, EventsQuery};
use crate::dto::ApiResponse;
use crate::models::statistics::{CustomerSpending, FleetStatistics};
use crate::models::Vehicle;
use crate::services::notifications::{EventJournal, JournalEntry};
use crate::services::{FleetService, StatisticsService};
use crate::utils::errors::AppResult;

/// Tamaño del ranking cuando no se indica `count`
const DEFAULT_TOP_COUNT: usize = 10;

pub struct StatisticsController {
    fleet: Arc<FleetService>,
    statistics: Arc<StatisticsService>,
}

impl StatisticsController {
    pub fn new(fleet: Arc<FleetService>, statistics: Arc<StatisticsService>) -> Self {
        Self { fleet, statistics }
    }

    pub async fn report(&self) -> AppResult<ApiResponse<FleetStatistics>> {
        Ok(ApiResponse::success(self.statistics.report().await?))
    }

    pub async fn most_used_car(&self) -> AppResult<ApiResponse<Option<Vehicle>>> {
        Ok(ApiResponse::success(self.fleet.most_used_car().await?))
    }

    pub async fn top_paying_customers(&self, count: Option<usize>) -> AppResult<ApiResponse<Vec<CustomerSpending>>> {
        let count = count.unwrap_or(DEFAULT_TOP_COUNT);
        Ok(ApiResponse::success(self.fleet.top_paying_customers(count).await?))
    }

    pub async fn average_distance(&self) -> AppResult<ApiResponse<AverageDistanceResponse>> {
        let average_distance = self.fleet.average_car_distance().await?;
        Ok(ApiResponse::success(AverageDistanceResponse { average_distance }))
    }
}

/// Últimos eventos del diario, del más reciente al más antiguo
pub fn recent_events(journal: &EventJournal, query: &EventsQuery) -> ApiResponse<Vec<JournalEntry>> {
    let kind = query.kind.as_deref().map(str::trim).filter(|k| !k.is_empty());
    let entries: Vec<JournalEntry> = journal
        .entries()
        .into_iter()
        .rev()
        .filter(|entry| kind.map_or(true, |k| entry.event.kind() == k))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();
    ApiResponse::success(entries)
}

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventFilter {
    #[default]
    All,
    /// Registration has no end or ends in the future.
    Upcoming,
    Past,
}

#[derive(Deserialize, Debug, IntoParams)]
pub struct ListEventsQuery {
    #[serde(default)]
    pub filter: EventFilter,
}

use catalog::SweepReport;
use serde::{Deserialize, Serialize};

/// Query parameters of the orphan sweep.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SweepQuery {
    /// Unreferenced objects younger than this many seconds are kept.
    /// Defaults to one hour.
    pub grace_secs: Option<u64>,
}

pub const DEFAULT_SWEEP_GRACE_SECS: u64 = 3600;

#[derive(Serialize, utoipa::ToSchema)]
pub struct SweepResponse {
    #[schema(example = 42)]
    pub scanned: usize,
    #[schema(example = 38)]
    pub referenced: usize,
    #[schema(example = 3)]
    pub deleted: usize,
    #[schema(example = 1)]
    pub kept_recent: usize,
}

impl From<SweepReport> for SweepResponse {
    fn from(r: SweepReport) -> Self {
        Self {
            scanned: r.scanned,
            referenced: r.referenced,
            deleted: r.deleted,
            kept_recent: r.kept_recent,
        }
    }
}

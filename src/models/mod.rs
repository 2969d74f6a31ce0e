//! Project scheduling domain models.
//!
//! Provides the data types for describing a project (tasks, precedence,
//! worker demand, zone demand), the resources that can perform it
//! (contractors and their workers), and the resulting schedule.
//!
//! # Domain Mappings
//!
//! | u-project | Construction | Maintenance | Events |
//! |-----------|--------------|-------------|--------|
//! | Task | Work package | Work order | Setup step |
//! | Worker | Crew trade | Technician | Staff role |
//! | Contractor | Subcontractor | Service vendor | Agency |
//! | Zone | Site area | Plant section | Venue hall |
//! | Schedule | Build plan | Outage plan | Run sheet |

mod graph;
mod resource;
mod schedule;
mod task;
mod zone;

pub use graph::{ParentLink, TaskGraph};
pub use resource::{
    get_worker_contractor_pool, AgentId, Contractor, Worker, WorkerContractorPool,
};
pub use schedule::{Schedule, ScheduledTask, TaskSummary, Violation, ViolationType};
pub use task::{EdgeType, Precedence, Task, WorkerReq};
pub use zone::{Zone, ZoneConfiguration, ZoneReq, ZoneTransition, STATUS_ANY};

/// Integer time tick. One tick is whatever the caller decides (hour, day).
pub type Time = i64;

/// "Never": the duration of a task that cannot run with its team.
///
/// Kept well below `i64::MAX` so sums of a few of them cannot overflow.
pub const TIME_INF: Time = i64::MAX / 4;

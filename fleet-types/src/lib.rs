pub mod baseline;
pub mod cluster;
pub mod message;
pub mod operation;
pub mod schedule;

pub use baseline::Baseline;
pub use cluster::{CapacityType, Cluster, NodeGroup, NodeGroupStatus};
pub use message::{BusEnvelope, BusMessage};
pub use operation::{Action, OperationCluster, OperationMeta, OperationNodeGroup, Status, derive};
pub use schedule::{Schedule, ScheduleExecution, ScheduleTarget, ScheduleUpdate};

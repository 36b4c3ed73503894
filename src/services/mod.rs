pub mod data_service;
pub mod dispatch_service;
pub mod error_log_service;
pub mod fleet_service;
pub mod optimizer_service;
pub mod registration_service;
pub mod sensor_service;
pub mod sync_service;

pub use data_service::{DataStore, StoreSnapshot};
pub use dispatch_service::{DispatchOperations, DispatchService};
pub use error_log_service::{ClientErrorEntry, ErrorLogClient};
pub use fleet_service::{FleetService, FleetSnapshot, SaveHook, SyncSaveHook};
pub use optimizer_service::{NearestStopOptimizer, OptimizeRequest, OptimizedRoute, RouteOptimizer, SanitizingOptimizer};
pub use registration_service::{RegistrationOperations, RegistrationService};
pub use sensor_service::{BinSensorView, SensorService};
pub use sync_service::{HttpSyncClient, OfflineSyncClient, SyncClient, SyncMode};

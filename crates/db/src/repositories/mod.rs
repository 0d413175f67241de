//! Repositories: typed operations per collection (document store) and on
//! the `tasks` table (sqlx).

pub mod batch_repo;
pub mod egg_record_repo;
pub mod evaluation_request_repo;
pub mod frame_repo;
pub mod patient_repo;
pub mod task_repo;

pub use batch_repo::BatchRepo;
pub use egg_record_repo::EggRecordRepo;
pub use evaluation_request_repo::EvaluationRequestRepo;
pub use frame_repo::FrameRepo;
pub use patient_repo::PatientRepo;
pub use task_repo::TaskRepo;

pub mod asset_writer;
pub mod collections;
pub mod config_loader;
pub mod importer;
pub mod manifest;
pub mod material;
pub mod mesh_transform;
pub mod phase_barrier;
pub mod pipeline;
pub mod slot;
pub mod task_queue;
pub mod texture;
pub mod worker_pool;

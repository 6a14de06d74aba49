//! Tileforge - raster tile production for slippy-map viewers
//!
//! This library turns `(column, row, zoom)` tile requests into prioritized
//! work, runs that work on strategy-bound worker threads, and reads the
//! binary map-data format used for local rendering.
//!
//! # High-Level API
//!
//! ```ignore
//! use tileforge::coord::TileAddress;
//! use tileforge::job::RenderJob;
//! use tileforge::scheduler::{JobScheduler, SchedulerConfig};
//! use tileforge::strategy::{ReqwestClient, RemoteSource, StrategyFactory};
//!
//! let factory = StrategyFactory::new(registry, Arc::new(ReqwestClient::new(10, "tileforge")?),
//!     RemoteSource::openstreetmap());
//! let (scheduler, mut deliveries) = JobScheduler::start(&SchedulerConfig::default(), &factory)?;
//!
//! scheduler.submit(RenderJob::remote(TileAddress::new(35, 21, 6)).with_priority(5))?;
//! let delivery = deliveries.blocking_recv();
//! ```

pub mod codec;
pub mod config;
pub mod coord;
pub mod job;
pub mod logging;
pub mod mapfile;
pub mod scheduler;
pub mod strategy;

/// Version of the Tileforge library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod bootstrap;
pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod entity;
pub mod fetch;
pub mod hub;
pub mod output;
pub mod schedule;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}

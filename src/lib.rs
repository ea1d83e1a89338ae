pub mod db;
pub mod jobs;
pub mod routeros;
pub mod scheduler;
pub mod server;
pub mod services;
pub mod sync;
pub mod web;

#[cfg(test)]
pub mod testkit;

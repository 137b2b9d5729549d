mod client;

pub use client::{Client, ClientPatch, Measurements, NewClient, OrderImages};

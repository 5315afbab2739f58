//! Chat sessions: the registry, the turn state machine and the controller
//! that ties them to a history store and a completion client.

pub mod controller;
pub mod observer;
pub mod registry;
pub mod single;
pub mod turn;

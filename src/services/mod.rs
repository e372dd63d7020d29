//! Ingress Contract (spec.md §4.F): the transport-facing seam between HTTP
//! handlers and the Bid Engine.

pub mod ingress;

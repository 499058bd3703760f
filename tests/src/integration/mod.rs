//! Integration flows across every subsystem.

#[cfg(test)]
mod order_flow;
#[cfg(test)]
mod peer_flow;
#[cfg(test)]
pub(crate) mod support;

//! Silicon model of the UltraSynth CGRA configuration interface.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of what the accelerator expects on its AXI slave port:
//! bus limits, the address bit-field layout, and the wire values of every
//! enumeration the driver sends.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`axi`] | Burst length limit, 4 KB boundary, transfer size |
//! | [`addr`] | `BusAddress` bit-fields, target classes, state words |
//! | [`regs`] | Single-register IDs, other-resource IDs, run states |
//! | [`ids`] | `IdRange` over CGRA internal parameter IDs |
//!
//! Every enumeration here is `#[repr(u32)]` with explicit discriminants.
//! The numeric values are the wire contract; never reorder variants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod addr;
pub mod axi;
pub mod ids;
pub mod regs;

pub use addr::{encode_state, BusAddress, TargetClass};
pub use ids::IdRange;
pub use regs::{OtherResource, RunState, SingleRegister};

// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for gateway attack simulation.
//!
//! This module provides utilities for driving the request pipeline with
//! hostile traffic patterns and tallying how each request was handled.

#![allow(dead_code)]

pub mod attacks;
pub mod generators;
pub mod metrics;

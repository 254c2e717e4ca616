// ABOUTME: Re-exports command modules for cadence-cli
// ABOUTME: Provides access to analyze, status, reconcile, and context commands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod analyze;
pub mod context;
pub mod reconcile;
pub mod status;

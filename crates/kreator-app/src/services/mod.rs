// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the command line to the kreator backend crates.
//
// Settings resolution and page loading live here so `main` only wires
// arguments to the pipeline and prints the outcome.

pub mod data_dir;
pub mod pages;
pub mod settings;

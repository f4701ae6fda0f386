// SPDX-FileCopyrightText: 2026 Ghostwriter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the storage primitives.

pub mod kv;
pub mod lists;
pub mod queue;

// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions over the [`Database`](crate::Database).

pub mod turns;

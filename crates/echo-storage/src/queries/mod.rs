// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Row mapping happens here and nowhere else.

pub mod facts;
pub mod messages;

// SPDX-License-Identifier: Apache-2.0

pub(crate) mod billing;
pub(crate) mod clients;
pub(crate) mod finance;
pub(crate) mod handlers;
pub(crate) mod quotes;
pub(crate) mod team;
pub(crate) mod work_orders;

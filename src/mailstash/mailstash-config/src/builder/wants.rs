/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

#![allow(clippy::module_name_repetitions)]

use crate::field::{
    FieldPolicy, FieldServerDNS, FieldServerLogs, FieldServerSMTP, FieldStorage,
};

///
pub struct WantsServer(pub(crate) ());

///
pub struct WantsServerInterfaces {
    #[allow(dead_code)]
    pub(crate) parent: WantsServer,
    pub(super) name: String,
    pub(super) client_count_max: i64,
    pub(super) message_size_limit: usize,
}

///
pub struct WantsServerLogs {
    pub(crate) parent: WantsServerInterfaces,
    pub(super) addr: Vec<std::net::SocketAddr>,
}

///
pub struct WantsServerSMTP {
    pub(crate) parent: WantsServerLogs,
    pub(super) logs: FieldServerLogs,
}

///
pub struct WantsServerDNS {
    pub(crate) parent: WantsServerSMTP,
    pub(super) smtp: FieldServerSMTP,
}

///
pub struct WantsStorage {
    pub(crate) parent: WantsServerDNS,
    pub(super) dns: FieldServerDNS,
}

///
pub struct WantsPolicy {
    pub(crate) parent: WantsStorage,
    pub(super) storage: FieldStorage,
}

///
pub struct WantsValidate {
    pub(crate) parent: WantsPolicy,
    pub(super) policy: FieldPolicy,
}

// SPDX-License-Identifier: Apache-2.0

//! Provider availability listing.

use codetutor_core::CompletionGateway;

use crate::output::ProvidersResult;

/// Lists every provider in priority order.
pub fn run(gateway: &CompletionGateway) -> ProvidersResult {
    ProvidersResult {
        providers: gateway.available_providers(),
    }
}

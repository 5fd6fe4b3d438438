// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[tokio::main]
async fn main() {
    let code = mst_cli::run().await;
    std::process::exit(code);
}

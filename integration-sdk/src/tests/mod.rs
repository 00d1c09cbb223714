//! Mock-server tests for the service clients
//!
//! Each client is pointed at a WireMock server; `expect(n)` on the mocks
//! verifies how many requests actually went out.

mod disabled_client_tests;
mod tokenizer_mock_tests;

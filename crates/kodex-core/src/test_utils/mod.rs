pub mod mock_gateway_server;
pub mod scripted_gateway;

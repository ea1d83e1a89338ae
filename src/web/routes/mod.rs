pub mod customer_routes;
pub mod router_routes;

use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .merge(public_routes())
        .merge(admin_routes(config))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::logout))
        .routes(routes!(handlers::auth::me))
}

fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::machine::list_machines))
        .routes(routes!(handlers::machine::list_featured_machines))
        .routes(routes!(handlers::machine::get_machine))
        .routes(routes!(handlers::customer::list_customers))
}

fn admin_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let max_object_size = config.storage.max_object_size;

    let machines = OpenApiRouter::new()
        .routes(routes!(
            handlers::machine::admin_list_machines,
            handlers::machine::create_machine
        ))
        .routes(routes!(
            handlers::machine::update_machine,
            handlers::machine::delete_machine
        ))
        .layer(handlers::machine::machine_form_body_limit(max_object_size));

    let customers = OpenApiRouter::new()
        .routes(routes!(
            handlers::customer::admin_list_customers,
            handlers::customer::create_customer
        ))
        .routes(routes!(
            handlers::customer::update_customer,
            handlers::customer::delete_customer
        ))
        .layer(handlers::customer::customer_form_body_limit(max_object_size));

    let storage = OpenApiRouter::new().routes(routes!(handlers::storage::sweep_storage));

    machines.merge(customers).merge(storage)
}

use crate::server::ServerRouter;

mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new().merge(users::routes())
}

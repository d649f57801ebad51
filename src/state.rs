use crate::guard::LoginGuard;
use crate::upstream::Upstream;
// app's shared state

pub struct AppState {
    pub guard: LoginGuard,
    pub upstream: Upstream,
    pub login_path: String, // route the guard sits in front of
}

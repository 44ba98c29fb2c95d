use crate::env::Environment;
use std::path::Path;

/// `user cwd $ `, with the home directory shown as `~`.
pub fn render(env: &Environment) -> String {
    let user = env
        .get_var("USER")
        .or_else(|| {
            nix::unistd::User::from_uid(nix::unistd::getuid())
                .ok()
                .flatten()
                .map(|user| user.name)
        })
        .unwrap_or_else(|| "user".to_string());
    format!("{user} {} $ ", display_dir(&env.current_dir, env.home().as_deref()))
}

fn display_dir(dir: &Path, home: Option<&Path>) -> String {
    match home.and_then(|home| dir.strip_prefix(home).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest.display()),
        None => dir.display().to_string(),
    }
}

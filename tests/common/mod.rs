//! Shared utilities for integration testing.

use std::fs;
use std::net::SocketAddr;

use nixaweb::config::SiteConfig;
use nixaweb::lifecycle::{launch, RunningServer, Shutdown};
use tempfile::TempDir;

pub const LAYOUT: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title><%= title %></title>
    <!-- shared layout -->
  </head>
  <body>
    <div id="loading-bar"></div>
    <main id="content"><%- content %></main>
  </body>
</html>
"#;

pub const INDEX: &str = "<h1>Welcome</h1>\n<p>This is main page.</p>";

pub const CONTACT: &str = "<h1>Contact</h1>\n<script>\n  function greet() {\n    var greeting = 'hello';\n    \
                           return greeting;\n  }\n  greet();\n</script>";

pub const INFORMATION: &str = "<h1>Information</h1>\n<p>This is information page.</p>";

/// A site on disk plus a running server.
pub struct TestSite {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    server: Option<RunningServer>,
    _dir: TempDir,
}

impl TestSite {
    /// Write the standard pages and start a server on an ephemeral port.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Like `start`, with a chance to adjust the configuration.
    pub async fn start_with(adjust: impl FnOnce(&mut SiteConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let views = dir.path().join("views");
        let public = dir.path().join("public");
        fs::create_dir(&views).unwrap();
        fs::create_dir(&public).unwrap();

        fs::write(dir.path().join("layout.ejs"), LAYOUT).unwrap();
        fs::write(views.join("index.ejs"), INDEX).unwrap();
        fs::write(views.join("contact.ejs"), CONTACT).unwrap();
        fs::write(views.join("information.ejs"), INFORMATION).unwrap();
        fs::write(views.join("notes.txt"), "not a page").unwrap();
        fs::write(public.join("site.js"), "// asset\nvar asset = 1;\n").unwrap();

        let mut config = SiteConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.templates.views_dir = views.display().to_string();
        config.templates.layout_path = dir.path().join("layout.ejs").display().to_string();
        config.static_files.dir = public.display().to_string();
        config.security.rate_limit.max_requests = 10_000;
        adjust(&mut config);

        let shutdown = Shutdown::new();
        let server = launch(config, &shutdown).await.unwrap();
        Self {
            addr: server.local_addr,
            shutdown,
            server: Some(server),
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to drain.
    pub async fn stop(mut self) {
        self.shutdown.trigger();
        if let Some(server) = self.server.take() {
            server.task.await.unwrap().unwrap();
        }
    }
}

/// Client that neither pools connections nor uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

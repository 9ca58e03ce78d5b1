use super::MailError;
use minijinja::{context, Environment};
use serde::Serialize;

const DECOMMISSION_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head></head>
  <body>
    <p>Hello {% if first %}{{ first }}{% else %}{{ netid }}{% endif %},</p>
    <p>
      Your Spinup TryIT server {{ fqdn }} expired on {{ expire_on }} and has been deleted.
      Thank you for using Spinup TryIT!
    </p>
    <p>
      Cheers,<br />
      Spinup Team<br />
      <a href="{{ spinup_url }}">{{ spinup_url }}</a>
      {% if spinup_site_url %}<a href="{{ spinup_site_url }}">{{ spinup_site_url }}</a>{% endif %}
    </p>
  </body>
</html>
"#;

const RENEWAL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head></head>
  <body>
    <p>Hello {% if first %}{{ first }}{% else %}{{ netid }}{% endif %},</p>
    <p>
      Your Spinup TryIT server {{ fqdn }} has been renewed and will expire on {{ expire_on }}.
      Thank you for using Spinup TryIT!
    </p>
    <p>
      Cheers,<br />
      Spinup Team<br />
      <a href="{{ spinup_url }}">{{ spinup_url }}</a>
      {% if spinup_site_url %}<a href="{{ spinup_site_url }}">{{ spinup_site_url }}</a>{% endif %}
    </p>
  </body>
</html>
"#;

const RENEWAL_PAGE_TEMPLATE: &str = r#"<html>
<head>
<meta http-equiv="refresh" content="2;url={{ redirect_url }}" />
<title>Success</title>
</head>
<body>
Success! Redirecting to the <a href="{{ redirect_url }}">spinup portal</a>.
</body>
</html>
"#;

pub const DECOMMISSION_SUBJECT: &str = "Your Spinup TryIT server has been deleted";
pub const RENEWAL_SUBJECT: &str = "Your Spinup TryIT server has been renewed";

/// Values available to the owner emails.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MailContext {
    pub first: String,
    pub netid: String,
    pub fqdn: String,
    pub expire_on: String,
    pub spinup_url: String,
    pub spinup_site_url: String,
}

/// The compiled HTML templates. Names end in `.html` so values are escaped.
pub struct MailTemplates {
    env: Environment<'static>,
}

impl MailTemplates {
    pub fn new() -> Result<Self, MailError> {
        let mut env = Environment::new();
        for (name, source) in [
            ("decommission.html", DECOMMISSION_TEMPLATE),
            ("renewal.html", RENEWAL_TEMPLATE),
            ("renewal_page.html", RENEWAL_PAGE_TEMPLATE),
        ] {
            env.add_template(name, source)
                .map_err(|err| MailError::Template(err.to_string()))?;
        }
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: impl Serialize) -> Result<String, MailError> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(ctx))
            .map_err(|err| MailError::Template(err.to_string()))
    }

    pub fn decommission_body(&self, ctx: &MailContext) -> Result<String, MailError> {
        self.render("decommission.html", ctx)
    }

    pub fn renewal_body(&self, ctx: &MailContext) -> Result<String, MailError> {
        self.render("renewal.html", ctx)
    }

    /// Page shown after a successful renewal, bouncing to `redirect_url`.
    pub fn renewal_page(&self, redirect_url: &str) -> Result<String, MailError> {
        self.render("renewal_page.html", context! { redirect_url })
    }
}

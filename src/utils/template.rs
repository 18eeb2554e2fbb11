//! String template rendering utilities.

pub struct TemplateVars;

impl TemplateVars {
    pub const SSH_PRIVATE_KEY_PATH: &'static str = "ssh_private_key_path";
    pub const HOME_DIR: &'static str = "home_dir";
}

pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

pub fn is_present(template: &str, key: &str) -> bool {
    let placeholder = format!("{{{{{}}}}}", key);
    template.contains(&placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_placeholder() {
        let rendered = render(
            "ssh -i {{ssh_private_key_path}} \"$@\"",
            &[(TemplateVars::SSH_PRIVATE_KEY_PATH, "/home/u/.ssh/key")],
        );
        assert_eq!(rendered, "ssh -i /home/u/.ssh/key \"$@\"");
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        let rendered = render("{{unknown}}", &[("key", "value")]);
        assert_eq!(rendered, "{{unknown}}");
    }

    #[test]
    fn is_present_detects_placeholder() {
        assert!(is_present("exec {{home_dir}}/bin", TemplateVars::HOME_DIR));
        assert!(!is_present("exec /bin", TemplateVars::HOME_DIR));
    }
}

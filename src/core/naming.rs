use std::collections::BTreeMap;

use crate::config::NamingConfig;

/// Rewrites private implementation module paths to the public ones users import
#[derive(Debug, Clone, Default)]
pub struct NameMapper {
    module_renames: BTreeMap<String, String>,
}

impl NameMapper {
    pub fn new(config: &NamingConfig) -> Self {
        Self {
            module_renames: config.module_renames.clone(),
        }
    }

    /// Public name of a module
    pub fn module_name(&self, full_module_name: &str) -> String {
        self.module_renames.get(full_module_name)
            .cloned()
            .unwrap_or_else(|| full_module_name.to_string())
    }

    /// Public name of a class, rewriting the longest renamed module prefix
    pub fn class_name(&self, full_class_name: &str) -> String {
        let best = self.module_renames.iter()
            .filter(|(private, _)| {
                full_class_name.len() > private.len()
                    && full_class_name.starts_with(private.as_str())
                    && full_class_name.as_bytes()[private.len()] == b'.'
            })
            .max_by_key(|(private, _)| private.len());

        match best {
            Some((private, public)) => format!("{}{}", public, &full_class_name[private.len()..]),
            None => full_class_name.to_string(),
        }
    }
}

/// Last dotted segment of a name
pub fn simple_name(dotted: &str) -> &str {
    dotted.rsplit('.').next().unwrap_or(dotted)
}

/// Label used for the receiver of instance members: `Drive` -> `drive`
pub fn self_arg_name(class_name: &str) -> String {
    let short = simple_name(class_name);
    let mut chars = short.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> NameMapper {
        let mut config = NamingConfig::default();
        config.module_renames.insert("wpilib._wpilib".to_string(), "wpilib".to_string());
        config.module_renames.insert("wpimath._controls._controls.controller".to_string(), "wpimath.controller".to_string());
        config.module_renames.insert("wpimath._controls._controls".to_string(), "wpimath.controls".to_string());
        NameMapper::new(&config)
    }

    #[test]
    fn test_module_name() {
        let names = mapper();
        assert_eq!(names.module_name("wpilib._wpilib"), "wpilib");
        assert_eq!(names.module_name("wpilib.drive"), "wpilib.drive");
    }

    #[test]
    fn test_class_name_uses_longest_prefix() {
        let names = mapper();
        assert_eq!(names.class_name("wpilib._wpilib.Timer"), "wpilib.Timer");
        assert_eq!(
            names.class_name("wpimath._controls._controls.controller.PIDController"),
            "wpimath.controller.PIDController"
        );
        assert_eq!(names.class_name("wpilib._wpilibx.Timer"), "wpilib._wpilibx.Timer");
        assert_eq!(names.class_name("float"), "float");
    }

    #[test]
    fn test_self_arg_name() {
        assert_eq!(self_arg_name("wpilib.DifferentialDrive"), "differentialDrive");
        assert_eq!(self_arg_name("Timer"), "timer");
        assert_eq!(self_arg_name(""), "");
    }
}

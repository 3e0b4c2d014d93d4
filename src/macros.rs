//! This module contains the macros used in the project.

/// Ask a value with `$reader`, save it in the config and return it
macro_rules! config_value {
    ($config:ident, $setting_name:ident, $struct_name:ident, $key_name:ident, $string:expr, $reader:expr) => {{
        println!(concat!("Please enter ", $string, ":"));
        let value = $reader?;
        let cloned_value = value.clone();
        $config.update(|config_data| match config_data.$setting_name.as_mut() {
            Some(local_config) => local_config.$key_name = Some(cloned_value),
            None => {
                config_data.$setting_name = Some($struct_name {
                    $key_name: Some(cloned_value),
                    ..Default::default()
                })
            }
        })?;
        value
    }};
}

/// Get a secret from the config, asking it (hidden) and saving it when missing
macro_rules! config_password_wrap {
    ($config:ident, $setting_name:ident, $struct_name:ident, $key_name:ident, $string:expr) => {
        match &$config.config_data.$setting_name {
            Some($struct_name {
                $key_name: Some(value),
                ..
            }) if !value.is_empty() => value.clone(),
            _ => $crate::config_value!(
                $config,
                $setting_name,
                $struct_name,
                $key_name,
                $string,
                $crate::utils::get_password()
            ),
        }
    };
}

pub(crate) use config_password_wrap;
pub(crate) use config_value;

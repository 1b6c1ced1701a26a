//! Launch command line of a server process
//!
//! A server is started as
//!
//! ```text
//! java <jvm args> -jar jboss-modules.jar -mp <module path> <module> <server args>
//! ```
//!
//! [`ServerCommandLine`] splits the argument vector into JVM arguments,
//! jboss-modules options, the launched module and the server ("class")
//! arguments, and answers option and system-property queries on them.

use std::collections::HashMap;

use crate::discovery::mode::ProcessRole;
use crate::error::{ProbeError, Result};

const JBOSS_MODULES_JAR: &str = "jboss-modules.jar";
const JBOSS_MODULES_MAIN: &str = "org.jboss.modules.Main";

/// JVM options whose value is the following token
const JVM_OPTIONS_WITH_VALUE: &[&str] = &["-cp", "-classpath", "--class-path", "--module-path", "-p"];

/// Describes one option of the server's own argument syntax
///
/// `-x`, `-x value` and `-x=value` match the short name `x`; `--xxx`,
/// `--xxx value` and `--xxx=value` match the long name `xxx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLineOption {
    short_name: Option<String>,
    long_name: Option<String>,
}

impl CommandLineOption {
    /// # Errors
    /// `ProbeError::Usage` when neither name is given
    pub fn new(short_name: Option<&str>, long_name: Option<&str>) -> Result<Self> {
        let short_name = short_name.filter(|s| !s.is_empty()).map(str::to_string);
        let long_name = long_name.filter(|s| !s.is_empty()).map(str::to_string);
        if short_name.is_none() && long_name.is_none() {
            return Err(ProbeError::Usage(
                "command line option needs a short or a long name".to_string(),
            ));
        }
        Ok(Self {
            short_name,
            long_name,
        })
    }

    pub fn short(name: &str) -> Self {
        Self {
            short_name: Some(name.to_string()),
            long_name: None,
        }
    }

    pub fn long(name: &str) -> Self {
        Self {
            short_name: None,
            long_name: Some(name.to_string()),
        }
    }

    pub fn with_long(mut self, name: &str) -> Self {
        self.long_name = Some(name.to_string());
        self
    }

    pub fn short_name(&self) -> Option<&str> {
        self.short_name.as_deref()
    }

    pub fn long_name(&self) -> Option<&str> {
        self.long_name.as_deref()
    }

    /// Value carried by `arg` if it is this option
    ///
    /// `Some(None)` means the value is the next token.
    fn match_arg<'a>(&self, arg: &'a str) -> Option<Option<&'a str>> {
        let forms = [
            self.short_name.as_deref().map(|n| ("-", n)),
            self.long_name.as_deref().map(|n| ("--", n)),
        ];
        for (dashes, name) in forms.into_iter().flatten() {
            let Some(rest) = arg.strip_prefix(dashes).and_then(|r| r.strip_prefix(name)) else {
                continue;
            };
            if rest.is_empty() {
                return Some(None);
            }
            if let Some(value) = rest.strip_prefix('=') {
                return Some(Some(value));
            }
        }
        None
    }
}

/// Look up `option` in `args`, scanning left to right
///
/// - `-c=foo` / `--server-config=foo`: `"foo"`
/// - `-c foo`: `"foo"`
/// - `-c` as the last token, or followed by another option: `""`
/// - not present: `None`
pub fn find_option(args: &[String], option: &CommandLineOption) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        match option.match_arg(arg) {
            Some(Some(value)) => return Some(value.to_string()),
            Some(None) => {
                let value = args.get(i + 1).filter(|next| !next.starts_with('-'));
                return Some(value.cloned().unwrap_or_default());
            }
            None => {}
        }
    }
    None
}

/// `-Dkey=value` arguments as a map; `-Dkey` maps to `""`
fn collect_system_properties<'a>(args: impl Iterator<Item = &'a String>, into: &mut HashMap<String, String>) {
    for arg in args {
        if let Some(property) = arg.strip_prefix("-D") {
            let (key, value) = property.split_once('=').unwrap_or((property, ""));
            if !key.is_empty() {
                into.insert(key.to_string(), value.to_string());
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerCommandLine {
    executable: String,
    jvm_args: Vec<String>,
    /// Main class, or the jar given to `-jar`
    main: Option<String>,
    module_path: Option<String>,
    app_module: Option<String>,
    class_args: Vec<String>,
}

impl ServerCommandLine {
    /// Split a full argument vector, executable first
    pub fn parse(args: &[String]) -> Self {
        let mut parsed = Self::default();
        let mut iter = args.iter();
        parsed.executable = iter.next().cloned().unwrap_or_default();

        while let Some(arg) = iter.next() {
            if arg == "-jar" {
                parsed.main = iter.next().cloned();
                break;
            }
            if !arg.starts_with('-') {
                parsed.main = Some(arg.clone());
                break;
            }
            parsed.jvm_args.push(arg.clone());
            if JVM_OPTIONS_WITH_VALUE.contains(&arg.as_str()) {
                if let Some(value) = iter.next() {
                    parsed.jvm_args.push(value.clone());
                }
            }
        }

        let rest: Vec<String> = iter.cloned().collect();
        if parsed.launches_jboss_modules() {
            parsed.parse_module_args(rest);
        } else {
            parsed.class_args = rest;
        }
        parsed
    }

    fn launches_jboss_modules(&self) -> bool {
        self.main
            .as_deref()
            .map(|main| main.ends_with(JBOSS_MODULES_JAR) || main == JBOSS_MODULES_MAIN)
            .unwrap_or(false)
    }

    /// jboss-modules options come before the module name; everything after
    /// the module name belongs to the server
    fn parse_module_args(&mut self, rest: Vec<String>) {
        let mut iter = rest.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-mp" | "-modulepath" => self.module_path = iter.next(),
                "-jaxpmodule" | "-logmodule" | "-dep" | "-deps" | "-cp" | "-classpath" => {
                    iter.next();
                }
                "-jar" | "-class" => {}
                option if option.starts_with('-') => {}
                _ => {
                    self.app_module = Some(arg);
                    break;
                }
            }
        }
        self.class_args = iter.collect();
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn jvm_args(&self) -> &[String] {
        &self.jvm_args
    }

    pub fn main(&self) -> Option<&str> {
        self.main.as_deref()
    }

    /// Value of jboss-modules' `-mp`
    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    /// Module launched by jboss-modules, e.g. `org.jboss.as.standalone`
    pub fn app_module(&self) -> Option<&str> {
        self.app_module.as_deref()
    }

    /// Arguments handed to the server itself
    pub fn class_args(&self) -> &[String] {
        &self.class_args
    }

    /// `-D` properties from the JVM and server arguments; server arguments
    /// override JVM ones
    pub fn system_properties(&self) -> HashMap<String, String> {
        let mut properties = HashMap::new();
        collect_system_properties(self.jvm_args.iter(), &mut properties);
        collect_system_properties(self.class_args.iter(), &mut properties);
        properties
    }

    pub fn system_property(&self, key: &str) -> Option<String> {
        self.system_properties().remove(key)
    }

    /// Look up a server option; see [`find_option`]
    pub fn get_class_option(&self, option: &CommandLineOption) -> Option<String> {
        find_option(&self.class_args, option)
    }

    pub fn role(&self) -> Option<ProcessRole> {
        self.app_module.as_deref().and_then(ProcessRole::from_module)
    }
}

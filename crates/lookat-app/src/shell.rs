// ABOUTME: The interactive shell: reads command lines and runs them against a session.
// ABOUTME: A failed command prints its error and the shell carries on with the next line.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use lookat_core::{Binning, Config, Handle};
use lookat_data::{DataLibrary, Histogram};
use lookat_layout::Surface;
use lookat_session::{sel, DrawOptions, RatioOptions, Session};

use crate::command::{parse_line, Call, Value};

const MAX_ALIAS_DEPTH: usize = 8;

const LISTS: &[&str] = &["trees", "histograms", "canvases", "files"];

const HELP: &[(&str, &str)] = &[
    ("add_file(path)", "open a data file and make it current"),
    ("close_file([file])", "close the current or the given file"),
    ("ls()", "list the trees in the current file"),
    ("load(tree)", "load a tree from the current file"),
    ("create_chain(tree, paths)", "join tree `tree` from several files"),
    ("branches([tree])", "list the branches of a tree"),
    (
        "draw(expression, same_pad, selection, name, binning, tree)",
        "fill a histogram and draw it",
    ),
    ("draw_ratio(num, den, normalised, name)", "divide the two latest histograms"),
    (
        "draw_corrected(expression, efficiency, same_pad, selection, name, binning, tree)",
        "fill weighted by 1/efficiency and draw it",
    ),
    ("normalise()", "scale the histogram on the current pad to unit area"),
    ("legend(labels)", "legend entries for the histograms on the current canvas"),
    ("get_legend()", "list the legend of the current canvas"),
    ("canvas([name])", "start a new canvas"),
    ("put_texts(title, xlabel, ylabel)", "label the current pad"),
    ("show([target])", "redraw a canvas, or the canvas showing an object"),
    ("sel(var, low, high)", "range selection for draw"),
    ("save_objects(path)", "write every histogram to a JSON file"),
    ("save_config([path])", "write the settings in use as TOML"),
    ("resolve(name)", "describe a registered object"),
    ("trees, histograms, canvases, files", "list session objects, name[i] for one"),
    ("state", "what the session is ready for"),
    ("aliases", "commands imported from the helper file"),
    ("help", "this list"),
    ("exit, quit", "leave lookat"),
];

const BUILTINS: &[&str] = &[
    "add_file",
    "close_file",
    "ls",
    "load",
    "create_chain",
    "branches",
    "draw",
    "draw_ratio",
    "draw_corrected",
    "normalise",
    "legend",
    "get_legend",
    "canvas",
    "put_texts",
    "show",
    "sel",
    "save_objects",
    "save_config",
    "resolve",
    "trees",
    "histograms",
    "canvases",
    "files",
    "state",
    "aliases",
    "help",
    "exit",
    "quit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Mistakes in how a command was called
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '{0}', type help for a list")]
    Unknown(String),

    #[error("{command}() takes at most {max} arguments")]
    TooManyArguments { command: String, max: usize },

    #[error("{command}() has no argument '{argument}'")]
    UnknownKeyword { command: String, argument: String },

    #[error("{command}() got '{argument}' twice")]
    Duplicate { command: String, argument: String },

    #[error("{command}() needs '{argument}'")]
    Missing {
        command: String,
        argument: &'static str,
    },

    #[error("{command}(): '{argument}' must be a {expected}, got a {found}")]
    WrongType {
        command: String,
        argument: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("'{0}(...)' cannot be used as an argument")]
    NotAValue(String),

    #[error("'{0}' cannot be indexed")]
    NotIndexable(String),

    #[error("{list}[{index}] is out of range, there are {len}")]
    OutOfRange {
        list: String,
        index: usize,
        len: usize,
    },

    #[error("Aliases nest too deeply in '{0}'")]
    AliasDepth(String),

    #[error("Alias '{alias}' needs {needed} arguments, got {given}")]
    AliasArguments {
        alias: String,
        needed: usize,
        given: usize,
    },
}

/// Arguments of one call, matched to the command's parameter names
struct Args {
    command: String,
    names: &'static [&'static str],
    values: Vec<Option<Value>>,
}

impl Args {
    fn bind(call: Call, names: &'static [&'static str]) -> Result<Self, CommandError> {
        if call.args.len() > names.len() {
            return Err(CommandError::TooManyArguments {
                command: call.name,
                max: names.len(),
            });
        }
        let mut values: Vec<Option<Value>> = vec![None; names.len()];
        for (slot, value) in values.iter_mut().zip(call.args) {
            *slot = Some(value);
        }
        for (key, value) in call.kwargs {
            let Some(index) = names.iter().position(|n| *n == key) else {
                return Err(CommandError::UnknownKeyword {
                    command: call.name,
                    argument: key,
                });
            };
            if values[index].is_some() {
                return Err(CommandError::Duplicate {
                    command: call.name,
                    argument: key,
                });
            }
            values[index] = Some(value);
        }
        Ok(Self {
            command: call.name,
            names,
            values,
        })
    }

    fn take(&mut self, index: usize) -> Option<Value> {
        match self.values[index].take() {
            Some(Value::None) | None => None,
            Some(value) => Some(value),
        }
    }

    fn wrong_type(&self, index: usize, expected: &'static str, found: &Value) -> CommandError {
        CommandError::WrongType {
            command: self.command.clone(),
            argument: self.names[index],
            expected,
            found: found.type_name(),
        }
    }

    fn missing(&self, index: usize) -> CommandError {
        CommandError::Missing {
            command: self.command.clone(),
            argument: self.names[index],
        }
    }

    fn string(&mut self, index: usize) -> Result<Option<String>, CommandError> {
        match self.take(index) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(other) => Err(self.wrong_type(index, "string", &other)),
        }
    }

    fn required_string(&mut self, index: usize) -> Result<String, CommandError> {
        self.string(index)?.ok_or_else(|| self.missing(index))
    }

    /// A name or a handle, as text the session can resolve
    fn target(&mut self, index: usize) -> Result<Option<String>, CommandError> {
        match self.take(index) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(Value::Handle(h)) => Ok(Some(h.to_string())),
            Some(Value::Int(i)) if i >= 0 => Ok(Some(Handle(i as u64).to_string())),
            Some(other) => Err(self.wrong_type(index, "name or handle", &other)),
        }
    }

    fn handle(&mut self, index: usize) -> Result<Option<Handle>, CommandError> {
        match self.take(index) {
            None => Ok(None),
            Some(Value::Handle(h)) => Ok(Some(h)),
            Some(Value::Int(i)) if i >= 0 => Ok(Some(Handle(i as u64))),
            Some(other) => Err(self.wrong_type(index, "handle", &other)),
        }
    }

    fn flag(&mut self, index: usize) -> Result<Option<bool>, CommandError> {
        match self.take(index) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::Int(i)) => Ok(Some(i != 0)),
            Some(other) => Err(self.wrong_type(index, "boolean", &other)),
        }
    }

    fn number(&mut self, index: usize) -> Result<f64, CommandError> {
        match self.take(index) {
            None => Err(self.missing(index)),
            Some(Value::Int(i)) => Ok(i as f64),
            Some(Value::Float(x)) => Ok(x),
            Some(other) => Err(self.wrong_type(index, "number", &other)),
        }
    }

    /// One string or a list of strings
    fn strings(&mut self, index: usize) -> Result<Vec<String>, CommandError> {
        match self.take(index) {
            None => Err(self.missing(index)),
            Some(Value::Str(s)) => Ok(vec![s]),
            Some(Value::List(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Str(s) => Ok(s),
                    other => Err(self.wrong_type(index, "list of strings", &other)),
                })
                .collect(),
            Some(other) => Err(self.wrong_type(index, "list of strings", &other)),
        }
    }

    /// One path or a list of paths
    fn paths(&mut self, index: usize) -> Result<Vec<PathBuf>, CommandError> {
        match self.take(index) {
            None => Err(self.missing(index)),
            Some(Value::Str(s)) => Ok(vec![PathBuf::from(s)]),
            Some(Value::List(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Str(s) => Ok(PathBuf::from(s)),
                    other => Err(self.wrong_type(index, "list of paths", &other)),
                })
                .collect(),
            Some(other) => Err(self.wrong_type(index, "list of paths", &other)),
        }
    }
}

/// Runs commands against a session over the built-in library, writing
/// replies to `out`. Plots go to the session's surface.
pub struct Shell<S, O> {
    session: Session<DataLibrary, S>,
    aliases: BTreeMap<String, String>,
    out: O,
}

impl<S, O> Shell<S, O>
where
    S: Surface<Histogram>,
    O: Write,
{
    pub fn new(session: Session<DataLibrary, S>, out: O) -> Self {
        Self {
            session,
            aliases: BTreeMap::new(),
            out,
        }
    }

    pub fn session(&self) -> &Session<DataLibrary, S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<DataLibrary, S> {
        &mut self.session
    }

    /// Make helper aliases callable. Names of built-in commands are skipped.
    pub fn add_aliases(&mut self, aliases: BTreeMap<String, String>) -> usize {
        let mut added = 0;
        for (name, body) in aliases {
            if BUILTINS.contains(&name.as_str()) {
                tracing::warn!(name, "Helper alias shadows a built-in command, ignored");
                continue;
            }
            self.aliases.insert(name, body);
            added += 1;
        }
        added
    }

    /// Read commands until end of input or `exit`
    pub fn run<R: BufRead>(&mut self, input: R, interactive: bool) -> Result<()> {
        let prompt = self.session.config().shell.prompt.clone();
        let mut lines = input.lines();
        loop {
            if interactive {
                write!(self.out, "{prompt}")?;
                self.out.flush()?;
            }
            let Some(line) = lines.next() else {
                if interactive {
                    writeln!(self.out)?;
                }
                break;
            };
            match self.execute(&line?) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(e) => {
                    tracing::debug!(error = ?e, "Command failed");
                    writeln!(self.out, "Error: {e}")?;
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn execute(&mut self, line: &str) -> Result<Flow> {
        self.execute_nested(line, 0)
    }

    fn execute_nested(&mut self, line: &str, depth: usize) -> Result<Flow> {
        let Some(call) = parse_line(line)? else {
            return Ok(Flow::Continue);
        };
        if let Some(body) = self.aliases.get(&call.name) {
            if depth >= MAX_ALIAS_DEPTH {
                return Err(CommandError::AliasDepth(call.name).into());
            }
            let expanded = expand_alias(&call, body)?;
            tracing::debug!(alias = %call.name, %expanded, "Expanded alias");
            return self.execute_nested(&expanded, depth + 1);
        }
        self.dispatch(call)
    }

    fn dispatch(&mut self, call: Call) -> Result<Flow> {
        if let Some(index) = call.index {
            return self.list_entry(&call.name, index);
        }
        let call = evaluate(call)?;

        match call.name.as_str() {
            "exit" | "quit" => return Ok(Flow::Exit),
            "help" => self.help()?,
            "add_file" => {
                let mut args = Args::bind(call, &["path"])?;
                let path = args.required_string(0)?;
                let handle = self.session.add_file(&path)?;
                writeln!(self.out, "{handle} file '{path}'")?;
            }
            "close_file" => {
                let mut args = Args::bind(call, &["file"])?;
                let which = args.handle(0)?;
                let handle = self.session.close_file(which)?;
                writeln!(self.out, "Closed {handle}")?;
            }
            "ls" => {
                Args::bind(call, &[])?;
                for name in self.session.ls()? {
                    writeln!(self.out, "{name}")?;
                }
            }
            "load" => {
                let mut args = Args::bind(call, &["tree"])?;
                let tree = args.required_string(0)?;
                let handle = self.session.load(&tree)?;
                self.describe(handle)?;
            }
            "create_chain" => {
                let mut args = Args::bind(call, &["tree", "paths"])?;
                let tree = args.required_string(0)?;
                let paths = args.paths(1)?;
                let handle = self.session.create_chain(&tree, &paths)?;
                self.describe(handle)?;
            }
            "branches" => {
                let mut args = Args::bind(call, &["tree"])?;
                let tree = args.target(0)?;
                for name in self.session.branches(tree.as_deref())? {
                    writeln!(self.out, "{name}")?;
                }
            }
            "draw" => {
                let mut args = Args::bind(
                    call,
                    &["expression", "same_pad", "selection", "name", "binning", "tree"],
                )?;
                let expression = args.required_string(0)?;
                let options = DrawOptions {
                    same_pad: args.flag(1)?.unwrap_or(false),
                    selection: args.string(2)?,
                    name: args.string(3)?,
                    binning: args.string(4)?.map(|b| b.parse::<Binning>()).transpose()?,
                    tree: args.target(5)?,
                };
                let handle = self.session.draw(&expression, options)?;
                self.describe(handle)?;
            }
            "draw_ratio" => {
                let mut args = Args::bind(call, &["num", "den", "normalised", "name"])?;
                let options = RatioOptions {
                    numerator: args.target(0)?,
                    denominator: args.target(1)?,
                    normalised: args.flag(2)?,
                    name: args.string(3)?,
                };
                let handle = self.session.draw_ratio(options)?;
                self.describe(handle)?;
            }
            "draw_corrected" => {
                let mut args = Args::bind(
                    call,
                    &["expression", "efficiency", "same_pad", "selection", "name", "binning", "tree"],
                )?;
                let expression = args.required_string(0)?;
                let efficiency = args.target(1)?.ok_or_else(|| args.missing(1))?;
                let options = DrawOptions {
                    same_pad: args.flag(2)?.unwrap_or(false),
                    selection: args.string(3)?,
                    name: args.string(4)?,
                    binning: args.string(5)?.map(|b| b.parse::<Binning>()).transpose()?,
                    tree: args.target(6)?,
                };
                let handle = self.session.draw_corrected(&expression, &efficiency, options)?;
                self.describe(handle)?;
            }
            "normalise" => {
                Args::bind(call, &[])?;
                let handle = self.session.normalise()?;
                self.describe(handle)?;
            }
            "legend" => {
                let mut args = Args::bind(call, &["labels"])?;
                let labels = args.strings(0)?;
                self.session.legend(&labels)?;
            }
            "get_legend" => {
                Args::bind(call, &[])?;
                for (handle, label) in self.session.get_legend()? {
                    writeln!(self.out, "{handle} {}", Value::Str(label))?;
                }
            }
            "canvas" => {
                let mut args = Args::bind(call, &["name"])?;
                let name = args.string(0)?;
                let handle = self.session.canvas(name.as_deref())?;
                writeln!(self.out, "{handle} canvas")?;
            }
            "put_texts" => {
                let mut args = Args::bind(call, &["title", "xlabel", "ylabel"])?;
                let title = args.string(0)?;
                let xlabel = args.string(1)?;
                let ylabel = args.string(2)?;
                self.session
                    .put_texts(title.as_deref(), xlabel.as_deref(), ylabel.as_deref())?;
            }
            "show" => {
                let mut args = Args::bind(call, &["target"])?;
                let target = args.target(0)?;
                self.session.show(target.as_deref())?;
            }
            "sel" => {
                let mut args = Args::bind(call, &["var", "low", "high"])?;
                let text = selection(&mut args)?;
                writeln!(self.out, "{}", Value::Str(text))?;
            }
            "save_objects" => {
                let mut args = Args::bind(call, &["path"])?;
                let path = PathBuf::from(args.required_string(0)?);
                let count = self.session.save_objects(&path)?;
                writeln!(self.out, "Saved {count} histograms to {}", path.display())?;
            }
            "save_config" => {
                let mut args = Args::bind(call, &["path"])?;
                let path = args
                    .string(0)?
                    .map(PathBuf::from)
                    .or_else(Config::default_path)
                    .ok_or_else(|| args.missing(0))?;
                self.session.config().save(&path)?;
                writeln!(self.out, "Saved settings to {}", path.display())?;
            }
            "resolve" => {
                let mut args = Args::bind(call, &["name"])?;
                let what = args.target(0)?.ok_or_else(|| args.missing(0))?;
                let object = self.session.resolve(&what)?;
                writeln!(self.out, "{object}")?;
            }
            "state" => {
                Args::bind(call, &[])?;
                writeln!(self.out, "{}", self.session.state())?;
            }
            "aliases" => {
                Args::bind(call, &[])?;
                for (name, body) in &self.aliases {
                    writeln!(self.out, "{name} = {body}")?;
                }
            }
            list if LISTS.contains(&list) => {
                Args::bind(call.clone(), &[])?;
                for line in self.list(list) {
                    writeln!(self.out, "{line}")?;
                }
            }
            _ => return Err(CommandError::Unknown(call.name).into()),
        }
        Ok(Flow::Continue)
    }

    fn list(&self, name: &str) -> Vec<String> {
        match name {
            "trees" => self.session.trees().map(ToString::to_string).collect(),
            "histograms" => self.session.histograms().map(ToString::to_string).collect(),
            "canvases" => self.session.canvases().iter().map(ToString::to_string).collect(),
            "files" => self.session.files().iter().map(ToString::to_string).collect(),
            _ => Vec::new(),
        }
    }

    fn list_entry(&mut self, name: &str, index: usize) -> Result<Flow> {
        if !LISTS.contains(&name) {
            return Err(CommandError::NotIndexable(name.to_string()).into());
        }
        let lines = self.list(name);
        let line = lines.get(index).ok_or_else(|| CommandError::OutOfRange {
            list: name.to_string(),
            index,
            len: lines.len(),
        })?;
        writeln!(self.out, "{line}")?;
        Ok(Flow::Continue)
    }

    fn describe(&mut self, handle: Handle) -> Result<()> {
        match self.session.registry().get(handle) {
            Some(object) => writeln!(self.out, "{object}")?,
            None => writeln!(self.out, "{handle}")?,
        }
        Ok(())
    }

    fn help(&mut self) -> Result<()> {
        let width = HELP.iter().map(|(usage, _)| usage.len()).max().unwrap_or(0);
        for (usage, what) in HELP {
            writeln!(self.out, "  {usage:<width$}  {what}")?;
        }
        if !self.aliases.is_empty() {
            writeln!(self.out, "Aliases: {}", self.aliases.keys().cloned().collect::<Vec<_>>().join(", "))?;
        }
        Ok(())
    }
}

fn selection(args: &mut Args) -> Result<String, CommandError> {
    let var = args.required_string(0)?;
    let low = args.number(1)?;
    let high = args.number(2)?;
    Ok(sel(&var, low, high))
}

/// Replace nested calls in the arguments by their values
fn evaluate(mut call: Call) -> Result<Call, CommandError> {
    call.args = call.args.into_iter().map(evaluate_value).collect::<Result<_, _>>()?;
    call.kwargs = call
        .kwargs
        .into_iter()
        .map(|(key, value)| evaluate_value(value).map(|v| (key, v)))
        .collect::<Result<_, _>>()?;
    Ok(call)
}

fn evaluate_value(value: Value) -> Result<Value, CommandError> {
    match value {
        Value::Call(inner) if inner.name == "sel" && inner.index.is_none() => {
            let mut args = Args::bind(evaluate(inner)?, &["var", "low", "high"])?;
            selection(&mut args).map(Value::Str)
        }
        Value::Call(inner) => Err(CommandError::NotAValue(inner.name)),
        Value::List(items) => items
            .into_iter()
            .map(evaluate_value)
            .collect::<Result<_, _>>()
            .map(Value::List),
        other => Ok(other),
    }
}

/// Fill `{0}`, `{1}`, ... in an alias body with the call's arguments.
/// Strings are inserted without their quotes. `{{` and `}}` stand for
/// literal braces, so `{{0}}` reaches the command as `{0}`.
fn expand_alias(call: &Call, body: &str) -> Result<String, CommandError> {
    if let Some((key, _)) = call.kwargs.first() {
        return Err(CommandError::UnknownKeyword {
            command: call.name.clone(),
            argument: key.clone(),
        });
    }

    let mut expanded = String::with_capacity(body.len());
    let mut needed = 0;
    let mut rest = body;
    while let Some(brace) = rest.find(|c| c == '{' || c == '}') {
        expanded.push_str(&rest[..brace]);
        let tail = &rest[brace..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            expanded.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            expanded.push('}');
            rest = &tail[1..];
            continue;
        }

        let after = &tail[1..];
        let placeholder = after
            .find('}')
            .and_then(|close| after[..close].parse::<usize>().ok().map(|index| (close, index)));
        match placeholder {
            Some((close, index)) => {
                needed = needed.max(index + 1);
                if let Some(arg) = call.args.get(index) {
                    match arg {
                        Value::Str(s) => expanded.push_str(s),
                        other => expanded.push_str(&other.to_string()),
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                expanded.push('{');
                rest = after;
            }
        }
    }
    expanded.push_str(rest);

    if call.args.len() != needed {
        return Err(CommandError::AliasArguments {
            alias: call.name.clone(),
            needed,
            given: call.args.len(),
        });
    }
    Ok(expanded)
}

use std::env;
use std::io;
use std::io::Write;
use std::process;

use tracing_subscriber::EnvFilter;

use hanparse::token::{join_tokens, parse_tokens};
use hanparse::{korean, Analysis, Analyzer, Err, Grammar, Options, TagTable};

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} [options]

Reads word:tag;word:tag;... lines from stdin and prints their parse.

Options:
  -h, --help           Print this message
  -f, --full-detail    Keep single-child nodes in the tree
  -g, --grammar FILE   Grammar file (defaults to the built-in Korean grammar)
  -t, --tags FILE      Tag table file (defaults to the built-in Korean tag table)
  -s, --steps N        Give up a sentence after N production attempts",
    prog_name
  )
}

fn print_analysis(analysis: &Analysis) {
  println!("tags: {}", join_tokens(&analysis.mapped));
  println!("{}", analysis.tree);

  println!("phrases:");
  for phrase in analysis.phrases.iter() {
    let entries = phrase.iter().map(|e| e.to_string()).collect::<Vec<_>>();
    println!("  {}", entries.join(" "));
  }

  if !analysis.references.is_empty() {
    println!("references:");
    for r in analysis.references.iter() {
      println!("  {} ({}): {}", r.word, r.label.as_deref().unwrap_or(&r.tag), r.links.join(" "));
      if let Some(notes) = &r.notes {
        println!("    {}", notes);
      }
    }
  }
  println!();
}

fn analyze_line(analyzer: &Analyzer, line: &str, options: &Options) -> Result<(), Err> {
  let tokens = parse_tokens(line)?;
  for result in analyzer.analyze_text(tokens, options) {
    match result {
      Ok(analysis) => print_analysis(&analysis),
      Err(e) => println!("no parse: {}\n", e),
    }
  }
  Ok(())
}

struct Args {
  grammar: Option<String>,
  tags: Option<String>,
  options: Options,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let prog_name = iter.next().unwrap_or_else(|| "hanparse".to_string());

    let mut args = Self {
      grammar: None,
      tags: None,
      options: Options::default(),
    };

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-f" || o == "--full-detail" {
        args.options.full_detail = true;
      } else if o == "-g" || o == "--grammar" {
        args.grammar = Some(iter.next().ok_or_else(|| Self::make_error_message("missing grammar file", &prog_name))?);
      } else if o == "-t" || o == "--tags" {
        args.tags = Some(iter.next().ok_or_else(|| Self::make_error_message("missing tag file", &prog_name))?);
      } else if o == "-s" || o == "--steps" {
        let steps = iter
          .next()
          .and_then(|n| n.parse().ok())
          .ok_or_else(|| Self::make_error_message("--steps needs a number", &prog_name))?;
        args.options.parse.max_steps = Some(steps);
      } else {
        return Err(Self::make_error_message(&format!("unknown argument {}", o), prog_name));
      }
    }

    Ok(args)
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let grammar = match &opts.grammar {
    Some(path) => Grammar::read_from_file(path)?,
    None => korean::grammar()?,
  };
  let tags = match &opts.tags {
    Some(path) => TagTable::read_from_file(path)?,
    None => korean::tag_table()?,
  };
  let analyzer = Analyzer::new(grammar, tags);

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        if let Err(e) = analyze_line(&analyzer, input.trim(), &opts.options) {
          eprintln!("{}", e);
        }
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}

//! glovecache CLI Client
//!
//! Interactive command-line client for the glovecache server.

use clap::Parser;
use glovecache::protocol::Command;
use glovecache::Client;
use std::io::{self, Write};

/// glovecache CLI - Interactive Client
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 6390)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    println!("Connecting to glovecache at {}...", addr);
    let mut client = Client::connect(&addr).await?;
    println!("Connected! Type 'help' for available commands, 'quit' to exit.\n");

    loop {
        print!("glovecache> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("help") {
            print_help();
            continue;
        }

        match parse_command(input) {
            Ok(cmd) => match client.request(&cmd).await {
                Ok(response) => println!("{}", response),
                Err(glovecache::ClientError::ConnectionClosed) => {
                    eprintln!("Connection closed by server");
                    break;
                }
                Err(e) => eprintln!("Error: {}", e),
            },
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

fn parse_command(input: &str) -> anyhow::Result<Command> {
    let (cmd, rest) = match input.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd.to_uppercase(), rest.trim()),
        None => (input.to_uppercase(), ""),
    };
    let parts: Vec<&str> = rest.split_whitespace().collect();

    match cmd.as_str() {
        "PING" => Ok(Command::Ping),
        "INFO" => Ok(Command::Info),

        "CONTAINS" => match parts.as_slice() {
            [term] => Ok(Command::Contains { term: term.to_string() }),
            _ => anyhow::bail!("usage: CONTAINS <term>"),
        },

        "GET" => match parts.as_slice() {
            [term] => Ok(Command::Get { term: term.to_string() }),
            _ => anyhow::bail!("usage: GET <term>"),
        },

        "CLUSTER" => match parts.as_slice() {
            [term] => Ok(Command::Cluster { term: term.to_string(), k: None }),
            [term, k] => Ok(Command::Cluster {
                term: term.to_string(),
                k: Some(k.parse()?),
            }),
            _ => anyhow::bail!("usage: CLUSTER <term> [k]"),
        },

        "SIMILARITY" | "SIM" => match parts.as_slice() {
            [a, b] => Ok(Command::Similarity { a: a.to_string(), b: b.to_string() }),
            _ => anyhow::bail!("usage: SIMILARITY <term> <term>"),
        },

        "TOKENIZE" => {
            if rest.is_empty() {
                anyhow::bail!("usage: TOKENIZE <text>");
            }
            Ok(Command::Tokenize { text: rest.to_string() })
        }

        _ => anyhow::bail!("Unknown command: {}. Type 'help' for available commands.", cmd),
    }
}

fn print_help() {
    println!(
        r#"
Available commands:

  PING                  - Check server connectivity
  CONTAINS <term>       - 1 if the term is in the vocabulary, else 0
  GET <term>            - Embedding vector for a term
  CLUSTER <term> [k]    - The k nearest terms, the term itself first
  SIMILARITY <a> <b>    - Cosine similarity between two terms
  TOKENIZE <text>       - In-vocabulary, non-stopword terms of the text
  INFO                  - Server statistics

  help                  - Show this help
  quit / exit           - Exit the CLI

Examples:
  CLUSTER king 5
  SIMILARITY cat dog
  TOKENIZE The cat sat on the mat
"#
    );
}

use std::io::{self, Write};

use clap::Parser;
use tokio::time::Duration;

use stashdb_common::{DEFAULT_HOST, DEFAULT_PORT, Element};
use stashdb_protocol::{Command, Reply};

use stashdb_cli::{Client, ClientError};

#[derive(Parser, Debug)]
#[command(name = "stashdb-cli", about = "StashDB CLI client")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Timeout por requisição em segundos (0 = sem timeout)
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));

    let mut client = Client::connect(&addr, timeout).await?;

    // Modo comando único (via argumentos)
    if !args.command.is_empty() {
        let cmd = parse_command(&args.command).map_err(|e| anyhow::anyhow!(e))?;
        println!("{}", execute(&mut client, &cmd).await?);
        return Ok(());
    }

    println!("Conectado a {addr}");

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("stashdb> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }

        let cmd = match parse_command(&tokens) {
            Ok(cmd) => cmd,
            Err(e) => {
                println!("(error) {e}");
                continue;
            }
        };

        match execute(&mut client, &cmd).await {
            Ok(out) => println!("{out}"),
            Err(e) => println!("(error) {e}"),
        }

        // Resposta atrasada ainda pode estar a caminho; descarta a conexão.
        if client.is_poisoned() {
            match client.reconnect().await {
                Ok(()) => println!("(reconectado a {addr})"),
                Err(e) => println!("(error) reconexão falhou: {e}"),
            }
        }
    }

    Ok(())
}

/// Executa um comando e formata a resposta; erros do servidor viram texto.
async fn execute(client: &mut Client, cmd: &Command) -> anyhow::Result<String> {
    match client.request(cmd).await {
        Ok(reply) => Ok(format_reply(&reply)),
        Err(ClientError::Server(msg)) => Ok(format!("(error) {msg}")),
        Err(e) => Err(e.into()),
    }
}

/// Converte tokens do REPL em um Command.
///
/// `SET key <valor> [ttl_ms]`, `GET key`, `DEL key`, `KEYS`,
/// `INDEX key <índice>`, `PING`.
fn parse_command(tokens: &[String]) -> Result<Command, String> {
    let (name, rest) = tokens.split_first().ok_or("comando vazio")?;
    let arity = |n: usize| {
        if rest.len() == n {
            Ok(())
        } else {
            Err(format!("número errado de argumentos para '{name}'"))
        }
    };

    match name.to_uppercase().as_str() {
        "PING" => {
            arity(0)?;
            Ok(Command::Ping)
        }
        "KEYS" => {
            arity(0)?;
            Ok(Command::Keys)
        }
        "GET" => {
            arity(1)?;
            Ok(Command::Get {
                key: rest[0].clone(),
            })
        }
        "DEL" | "REMOVE" => {
            arity(1)?;
            Ok(Command::Remove {
                key: rest[0].clone(),
            })
        }
        "INDEX" => {
            arity(2)?;
            Ok(Command::Index {
                key: rest[0].clone(),
                index: parse_arg(&rest[1]),
            })
        }
        "SET" => {
            if rest.len() == 3 {
                let ttl = rest[2]
                    .parse()
                    .map_err(|_| format!("TTL inválido: {}", rest[2]))?;
                Ok(Command::Set {
                    key: rest[0].clone(),
                    value: parse_arg(&rest[1]),
                    ttl,
                })
            } else {
                arity(2)?;
                Ok(Command::Set {
                    key: rest[0].clone(),
                    value: parse_arg(&rest[1]),
                    ttl: 0,
                })
            }
        }
        _ => Err(format!("comando desconhecido: {name}")),
    }
}

/// Argumento que é JSON válido vai como JSON; o resto vai como string.
fn parse_arg(token: &str) -> Element {
    serde_json::from_str(token).unwrap_or_else(|_| Element::from(token))
}

/// Tokeniza a linha de input com suporte a strings quoted.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut quote_char = '"';
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quote {
            if c == quote_char {
                in_quote = false;
            } else if c == '\\' {
                match chars.peek() {
                    Some(&next) if matches!(next, '\\' | '"' | '\'') => {
                        current.push(next);
                        chars.next();
                    }
                    _ => current.push(c),
                }
            } else {
                current.push(c);
            }
        } else if c == '"' || c == '\'' {
            in_quote = true;
            quote_char = c;
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn format_element(element: &Element) -> String {
    serde_json::to_string(element).unwrap_or_else(|_| format!("{element:?}"))
}

/// Formata uma resposta para exibição humana.
fn format_reply(reply: &Reply) -> String {
    match reply {
        Reply::Error { error } => format!("(error) {error}"),
        Reply::Ok { .. } => "OK".to_string(),
        Reply::Element { element } => format_element(element),
        Reply::Value {
            kind,
            data,
            expires,
        } => {
            if *expires == 0 {
                format!("({kind}) {}", format_element(data))
            } else {
                format!("({kind}) {} [expira em {expires}]", format_element(data))
            }
        }
        Reply::Keys { keys } => {
            if keys.is_empty() {
                return "(empty)".to_string();
            }
            keys.iter()
                .enumerate()
                .map(|(i, k)| format!("{}) \"{k}\"", i + 1))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

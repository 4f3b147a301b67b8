//! Command-line parsing for the `yolp` binary.

use yolp_core::{NewRestaurant, RestaurantId, SignInRequest, SignUpRequest};

use crate::error::AppError;

pub const USAGE: &str = "\
Usage: yolp [--config <path>] <command>

Commands:
  whoami                              Show the signed-in user
  list                                List restaurants
  show <id>                           Show one restaurant
  add <name> [--description <text>] [--address <text>]
             [--phone <text>] [--image-url <url>]
                                      Add a restaurant
  sign-in <email> <password>          Start a session
  sign-up <name> <email> <password>   Create an account and start a session
  sign-out                            End the session (asks for confirmation)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    WhoAmI,
    List,
    Show(RestaurantId),
    Add(NewRestaurant),
    SignIn(SignInRequest),
    SignUp(SignUpRequest),
    SignOut,
    Help,
}

fn usage(message: impl Into<String>) -> AppError {
    AppError::Usage(format!("{}\n\n{USAGE}", message.into()))
}

/// Parse arguments (without the program name). `--config <path>` may appear
/// anywhere and is skipped here.
pub fn parse_args<I, S>(args: I) -> Result<Command, AppError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut positional = Vec::new();
    let mut options: Vec<(String, String)> = Vec::new();
    let mut iter = args.into_iter().map(Into::into);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--config" => {
                iter.next()
                    .ok_or_else(|| usage("--config requires a path"))?;
            }
            flag if flag.starts_with("--") => {
                let value = iter
                    .next()
                    .ok_or_else(|| usage(format!("{flag} requires a value")))?;
                options.push((flag.to_string(), value));
            }
            _ => positional.push(arg),
        }
    }

    let Some((name, rest)) = positional.split_first() else {
        return Ok(Command::Help);
    };
    let command = match (name.as_str(), rest) {
        ("whoami", []) => Command::WhoAmI,
        ("list", []) => Command::List,
        ("show", [id]) => Command::Show(
            id.parse()
                .map_err(|_| usage(format!("invalid restaurant id '{id}'")))?,
        ),
        ("add", [name]) => Command::Add(new_restaurant(name, &options)?),
        ("sign-in", [email, password]) => Command::SignIn(SignInRequest::new(email, password)),
        ("sign-up", [name, email, password]) => {
            Command::SignUp(SignUpRequest::new(name, email, password))
        }
        ("sign-out", []) => Command::SignOut,
        ("help", []) => Command::Help,
        (other, _) => return Err(usage(format!("unknown command or arguments: {other}"))),
    };

    if !matches!(command, Command::Add(_)) {
        if let Some((flag, _)) = options.first() {
            return Err(usage(format!("unexpected option {flag}")));
        }
    }
    Ok(command)
}

fn new_restaurant(name: &str, options: &[(String, String)]) -> Result<NewRestaurant, AppError> {
    let mut restaurant = NewRestaurant::new(name);
    for (flag, value) in options {
        restaurant = match flag.as_str() {
            "--description" => restaurant.with_description(value),
            "--address" => restaurant.with_address(value),
            "--phone" => restaurant.with_phone(value),
            "--image-url" => restaurant.with_image_url(value),
            other => return Err(usage(format!("unknown option {other}"))),
        };
    }
    Ok(restaurant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_args(["whoami"]).unwrap(), Command::WhoAmI);
        assert_eq!(parse_args(["--config", "yolp.toml", "list"]).unwrap(), Command::List);
        assert_eq!(parse_args(["show", "7"]).unwrap(), Command::Show(7));
        assert_eq!(parse_args(Vec::<String>::new()).unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_add_with_options() {
        let command = parse_args([
            "add",
            "Cafe X",
            "--address",
            "1 Main St",
            "--phone",
            "555-0100",
        ])
        .unwrap();
        assert_eq!(
            command,
            Command::Add(
                NewRestaurant::new("Cafe X")
                    .with_address("1 Main St")
                    .with_phone("555-0100")
            )
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_args(["show", "x"]), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(["list", "extra"]), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(["list", "--phone", "1"]), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(["add", "X", "--color", "red"]), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(["add", "X", "--phone"]), Err(AppError::Usage(_))));
    }
}

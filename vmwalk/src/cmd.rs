use argh::{FromArgValue, FromArgs};
use vmwalk::Pid;

pub struct Address(pub usize);

impl FromArgValue for Address {
    fn from_arg_value(value: &str) -> Result<Self, String> {
        let value = value.trim_start_matches("0x");
        let address = usize::from_str_radix(value, 16).map_err(|e| e.to_string())?;
        Ok(Self(address))
    }
}

#[derive(FromArgs)]
#[argh(description = "Walk the memory of a running process.")]
pub struct Commands {
    #[argh(switch, short = 'v', description = "debug logging")]
    pub verbose: bool,

    #[argh(subcommand)]
    pub cmds: CommandEnum,
}

#[derive(FromArgs)]
#[argh(subcommand)]
pub enum CommandEnum {
    Blocks(SubCommandBlocks),
    Region(SubCommandRegion),
    Base(SubCommandBase),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "blocks", description = "list committed accessible blocks")]
pub struct SubCommandBlocks {
    #[argh(option, short = 'p', description = "process id")]
    pub pid: Pid,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "region", description = "read the allocation at an address")]
pub struct SubCommandRegion {
    #[argh(option, short = 'p', description = "process id")]
    pub pid: Pid,

    #[argh(option, short = 'a', description = "start address, hex")]
    pub addr: Address,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "base", description = "print the primary module base")]
pub struct SubCommandBase {
    #[argh(option, short = 'p', description = "process id")]
    pub pid: Pid,
}

#[test]
fn test_parse_address() {
    assert_eq!(Address::from_arg_value("0x7ff6a000").unwrap().0, 0x7ff6a000);
    assert_eq!(Address::from_arg_value("10000").unwrap().0, 0x10000);
    assert!(Address::from_arg_value("0xzz").is_err());
}

use crate::cmd::ChecksumArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_checksum, OutputFormat};

pub fn run(args: ChecksumArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = args.payload.resolve()?;
    print_checksum(bytes.len(), amcom_frame::checksum(&bytes), format);
    Ok(SUCCESS)
}

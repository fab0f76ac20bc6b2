use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{
    PositiveUsize, TesterArgs, parse_duration_arg, parse_header, parse_interval_arg,
    parse_millis_arg,
};
use crate::error::{AppError, AppResult, ConfigError};

use super::types::ConfigFile;

const METHOD_ARGS: [&str; 6] = ["method", "get", "post", "head", "options", "trace"];

/// Applies configuration values to CLI arguments. Values given on the
/// command line always win.
///
/// # Errors
///
/// Returns an error when config values are invalid.
pub fn apply_config(
    args: &mut TesterArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "url")
        && let Some(url) = config.url.clone()
    {
        args.url = Some(url);
    }

    if !is_cli(matches, "concurrency")
        && let Some(concurrency) = config.concurrency
    {
        args.concurrency = ensure_positive_usize(concurrency, "concurrency")?;
    }

    if !is_cli(matches, "duration")
        && let Some(duration) = config.duration.as_ref()
    {
        args.duration = duration
            .to_duration(parse_duration_arg)
            .map_err(|err| invalid_duration("duration", err))?;
    }

    if !is_cli(matches, "interval")
        && let Some(interval) = config.interval.as_ref()
    {
        args.interval = interval
            .to_duration(parse_interval_arg)
            .map_err(|err| invalid_duration("interval", err))?;
    }

    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.request_timeout = timeout
            .to_duration(parse_millis_arg)
            .map_err(|err| invalid_duration("timeout", err))?;
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = timeout
            .to_duration(parse_millis_arg)
            .map_err(|err| invalid_duration("connect_timeout", err))?;
    }

    if !METHOD_ARGS.iter().any(|id| is_cli(matches, id))
        && let Some(method) = config.method
    {
        args.method = Some(method);
    }

    if !is_cli(matches, "data")
        && let Some(data) = config.data.clone()
    {
        args.data = Some(data);
    }

    if !is_cli(matches, "headers")
        && let Some(headers) = config.headers.as_ref()
    {
        let mut parsed = Vec::with_capacity(headers.len());
        for header in headers {
            let pair = parse_header(header)
                .map_err(|err| AppError::config(ConfigError::InvalidHeader { source: err }))?;
            parsed.push(pair);
        }
        args.headers = parsed;
    }

    if !is_cli(matches, "http2")
        && let Some(http2) = config.http2
    {
        args.http2 = http2;
    }

    if !is_cli(matches, "proxy")
        && let Some(proxy) = config.proxy.clone()
    {
        args.proxy = Some(proxy);
    }

    if !is_cli(matches, "socks5")
        && let Some(socks5) = config.socks5.clone()
    {
        args.socks5 = Some(socks5);
    }

    if !is_cli(matches, "reload")
        && let Some(reload) = config.reload
    {
        args.reload = reload;
    }

    if !is_cli(matches, "expected_status_code")
        && !is_cli(matches, "accept_2xx")
    {
        if let Some(status) = config.status {
            args.expected_status_code = status;
        }
        if let Some(accept) = config.accept_2xx {
            args.accept_2xx = accept;
        }
    }

    if !is_cli(matches, "urls_file")
        && let Some(path) = config.urls_file.clone()
    {
        args.urls_file = Some(path);
    }

    if !is_cli(matches, "queue_passes")
        && let Some(passes) = config.queue_passes
    {
        args.queue_passes = ensure_positive_usize(passes, "queue_passes")?;
    }

    if !is_cli(matches, "export_json")
        && let Some(path) = config.export_json.clone()
    {
        args.export_json = Some(path);
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_usize(value: usize, field: &'static str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value)
        .map_err(|err| AppError::config(ConfigError::FieldMustBePositive { field, source: err }))
}

fn invalid_duration(field: &'static str, err: AppError) -> AppError {
    match err {
        AppError::Validation(source) => {
            AppError::config(ConfigError::InvalidDuration { field, source })
        }
        other => other,
    }
}

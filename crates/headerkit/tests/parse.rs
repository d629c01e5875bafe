//! Integration tests for parsing real-world header blocks.
//!
//! The fixtures are captured responses and requests from public servers.

#![allow(clippy::unwrap_used)]

use headerkit::{
    Header, Headers, OneOrMany, ParseOptions, extract_header_block, parse, parse_bytes,
    parse_with, registry,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const RAW_HEADERS: &str = "accept-ch: DPR\r\n\
accept-ch-lifetime: 2592000\r\n\
alt-svc: quic=\":443\"; ma=2592000; v=\"46,43\", h3-Q050=\":443\"; ma=2592000, h3-Q049=\":443\"; ma=2592000, h3-Q048=\":443\"; ma=2592000, h3-Q046=\":443\"; ma=2592000, h3-Q043=\":443\"; ma=2592000\r\n\
cache-control: private, max-age=0\r\n\
content-encoding: br\r\n\
content-length: 64032\r\n\
content-type: text/html; charset=UTF-8\r\n\
date: Mon, 16 Mar 2020 21:27:31 GMT\r\n\
expires: -1\r\n\
p3p: CP=\"This is not a P3P policy! See g.co/p3phelp for more info.\"\r\n\
server: gws\r\n\
set-cookie: 1P_JAR=2020-03-16-21; expires=Wed, 15-Apr-2020 21:27:31 GMT; path=/; domain=.google.fr; Secure; SameSite=none\r\n\
set-cookie: NID=200=IGpBMMA3G7tki0niFFATFQ2BnsNceVP6XBtwOutoyw97AJ4_YFT5l1oLfLeX22xeI_STiP4omAB4rmMP3Sxgyo287ldQGwdZSdPOOZ_Md3roDOMAOtXEQ_hFbUvo0VPjS2gL1y00_6kQwpVxCghI2Ozrx-A4Xks3ZIXRj11RsWs; expires=Tue, 15-Sep-2020 21:27:31 GMT; path=/; domain=.google.fr; Secure; HttpOnly; SameSite=none\r\n\
set-cookie: CONSENT=WP.284b10; expires=Fri, 01-Jan-2038 00:00:00 GMT; path=/; domain=.google.fr\r\n\
status: 200\r\n\
strict-transport-security: max-age=31536000\r\n\
x-frame-options: SAMEORIGIN\r\n\
x-xss-protection: 0";

const RAW_HEADERS_MOZILLA: &str = "GET /home.html HTTP/1.1\r\n\
Host: developer.mozilla.org\r\n\
User-Agent: Mozilla/5.0 (Macintosh; Intel Mac OS X 10.9; rv:50.0) Gecko/20100101 Firefox/50.0\r\n\
Accept: text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8\r\n\
Accept-Language: en-US,en;q=0.5\r\n\
Accept-Encoding: gzip, deflate, br\r\n\
Referer: https://developer.mozilla.org/testpage.html\r\n\
Connection: keep-alive\r\n\
Upgrade-Insecure-Requests: 1\r\n\
If-Modified-Since: Mon, 18 Jul 2016 02:36:04 GMT\r\n\
If-None-Match: \"c561c68d0ba92bbeb8b0fff2a9199f722e3a621a\"\r\n\
Cache-Control: max-age=0";

const RAW_HEADERS_WITH_CONNECT: &str = "HTTP/1.1 200 Connection established\r\n\
\r\n\
HTTP/2 200\r\n\
date: Tue, 28 Sep 2021 13:45:34 GMT\r\n\
content-type: application/epub+zip\r\n\
content-length: 3706401\r\n\
content-disposition: filename=ipython-readthedocs-io-en-stable.epub\r\n\
x-amz-id-2: 2PO2WHP4qGqkhyC1VbRE2KLN2g4uk38vYzaNJDU/OBSxh4lUtYgERD2FNAOPkKPD1a6rsNBMeKI=\r\n\
etag: \"6f512f04591f7667486d044c54708448\"\r\n\
permissions-policy: interest-cohort=()\r\n\
strict-transport-security: max-age=31536000; includeSubDomains; preload\r\n\
expires: Tue, 28 Sep 2021 15:45:34 GMT\r\n\
cache-control: public, max-age=7200\r\n\
expect-ct: max-age=604800, report-uri=\"https://report-uri.cloudflare.com/cdn-cgi/beacon/expect-ct\"\r\n\
server: cloudflare";

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "headerkit=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

#[test]
fn test_parse_google_response() {
    init_tracing();
    let headers = parse(RAW_HEADERS);

    assert_eq!(headers.len(), 24);
    assert_eq!(headers.get_all("alt-svc").len(), 6);
    assert_eq!(headers.get_all("cache-control").len(), 2);
    assert_eq!(headers.get_all("set-cookie").len(), 3);
    assert_eq!(headers.get_all("date").len(), 1);

    assert!(!headers.has("received"));
    assert!(headers.get("received").is_none());
    assert!(headers.has("Cache-Control"));
}

#[test]
fn test_attribute_access() {
    let headers = parse(RAW_HEADERS);

    let x_frame = headers.get_all("x_frame_options")[0];
    assert_eq!(x_frame.content(), "SAMEORIGIN");
    assert_eq!(x_frame.to_text(), "x-frame-options: SAMEORIGIN");

    let accept_ch = headers.get_all("accept-ch")[0];
    assert_eq!(accept_ch.content(), "DPR");

    let p3p = headers.get_all("p3p")[0];
    assert_eq!(
        p3p.get("cp"),
        Some(OneOrMany::One(
            "This is not a P3P policy! See g.co/p3phelp for more info.".to_string()
        ))
    );

    let content_type = headers.get_all("Content-Type")[0];
    assert!(content_type.has("charset"));
    assert_eq!(content_type.get("charset"), Some(OneOrMany::One("UTF-8".to_string())));

    let cookies = headers.get_all("set-cookie");
    assert!(cookies[0].has("Secure"));
    assert_eq!(
        cookies[0].get("expires"),
        Some(OneOrMany::One("Wed, 15-Apr-2020 21:27:31 GMT".to_string()))
    );
    assert_eq!(
        cookies[1].get("nid"),
        Some(OneOrMany::One(
            "200=IGpBMMA3G7tki0niFFATFQ2BnsNceVP6XBtwOutoyw97AJ4_YFT5l1oLfLeX22xeI_STiP4omAB4rmMP3Sxgyo287ldQGwdZSdPOOZ_Md3roDOMAOtXEQ_hFbUvo0VPjS2gL1y00_6kQwpVxCghI2Ozrx-A4Xks3ZIXRj11RsWs".to_string()
        ))
    );

    let alt_svc = headers.get_all("alt-svc")[0];
    assert_eq!(alt_svc.get("v"), Some(OneOrMany::One("46,43".to_string())));
    assert_eq!(alt_svc.get("quic"), Some(OneOrMany::One(":443".to_string())));
}

#[test]
fn test_serialization_reproduces_input() {
    let headers = parse(RAW_HEADERS);
    assert_eq!(headers.to_text(), RAW_HEADERS);
    assert_eq!(headers.to_string(), RAW_HEADERS);
}

#[test]
fn test_to_dict() {
    let dict = parse(RAW_HEADERS).to_dict();

    assert!(dict.contains_key("set-cookie"));
    assert!(dict.contains_key("p3p"));

    let cookies = dict.get("set-cookie").unwrap();
    assert!(cookies.starts_with("1P_JAR=2020-03-16-21; expires=Wed, 15-Apr-2020 21:27:31 GMT; path=/;"));
    assert!(cookies.ends_with(
        "CONSENT=WP.284b10; expires=Fri, 01-Jan-2038 00:00:00 GMT; path=/; domain=.google.fr"
    ));
    assert_eq!(dict.get("cache_control"), Some("private, max-age=0"));
}

#[test]
fn test_equality_between_parses() {
    assert_eq!(parse(RAW_HEADERS), parse(RAW_HEADERS));
    assert_ne!(parse(RAW_HEADERS), parse(RAW_HEADERS_MOZILLA));
    assert_eq!(parse(RAW_HEADERS), parse_bytes(RAW_HEADERS.as_bytes()));
}

#[test]
fn test_request_line_skipped() {
    let headers = parse(RAW_HEADERS_MOZILLA);

    assert_eq!(headers.len(), 17);
    assert!(headers.has("host"));
    assert!(headers.has("Cache-Control"));
    assert!(headers.has("accept_encoding"));
    assert!(headers.has("accept_language"));

    let accept = headers.get_all("accept");
    assert_eq!(accept.len(), 4);
    assert_eq!(
        accept.last().unwrap().get("q"),
        Some(OneOrMany::One("0.8".to_string()))
    );

    let user_agent = headers.get_all("user-agent")[0];
    assert_eq!(user_agent.comments(), vec!["Macintosh; Intel Mac OS X 10.9; rv:50.0"]);

    let if_none_match = headers.get_all("if-none-match")[0];
    assert_eq!(if_none_match.content(), "c561c68d0ba92bbeb8b0fff2a9199f722e3a621a");
}

#[test]
fn test_serialized_request_reparses_equal() {
    let headers = parse(RAW_HEADERS_MOZILLA);
    let text = headers.to_text();

    assert!(text.contains("Accept: text/html, application/xhtml+xml, application/xml;q=0.9, */*;q=0.8"));
    assert_eq!(parse(&text), headers);
    assert_eq!(parse_bytes(text.as_bytes()), headers);
}

#[test]
fn test_proxy_preamble() {
    let headers = parse(RAW_HEADERS_WITH_CONNECT);

    assert!(headers.has("Date"));
    assert!(headers.has("Server"));
    assert_eq!(headers.len(), 14);

    let amz = headers.get_all("x-amz-id-2")[0];
    assert_eq!(amz.attrs().len(), 1);
    assert!(amz.valued_attrs().is_empty());

    let expect_ct = headers.get_all("expect-ct");
    assert_eq!(expect_ct.len(), 2);
    assert_eq!(
        expect_ct[1].get("report-uri"),
        Some(OneOrMany::One(
            "https://report-uri.cloudflare.com/cdn-cgi/beacon/expect-ct".to_string()
        ))
    );

    let block = extract_header_block(RAW_HEADERS_WITH_CONNECT.as_bytes());
    assert!(block.fully_decoded);
    assert_eq!(parse(block.headers), headers);
}

#[test]
fn test_registry_validation_on_parsed_headers() {
    let headers = parse(RAW_HEADERS);

    for header in &headers {
        if header.name() == "expires" {
            assert!(!registry::validate(header));
        } else {
            assert!(registry::validate(header), "{} should validate", header.name());
        }
    }

    let date = headers.get_all("date")[0].date().unwrap();
    assert_eq!(date.to_rfc2822(), "Mon, 16 Mar 2020 21:27:31 +0000");
}

#[test]
fn test_folded_mail_headers() {
    let raw = "Received: from mail.example.org\r\n\tby mx.example.com;\r\n Tue, 17 Mar 2020 08:29:37 +0000\r\n\
Subject: =?UTF-8?Q?Caf=C3=A9?= =?UTF-8?Q?_menu?=, today\r\n\
To: alice@example.org, bob@example.org\r\n\
\r\n\
Body: not parsed";
    let headers = parse(raw);

    assert_eq!(headers.keys(), vec!["Received", "Subject", "To"]);
    assert_eq!(headers.get_all("to").len(), 2);

    let subject = headers.get_all("subject")[0];
    assert_eq!(subject.content(), "Café menu, today");

    let received = headers.get_all("received")[0];
    assert!(received.raw_content().contains("\r\n\tby"));
    assert_eq!(
        received.unfolded_content(),
        "from mail.example.orgby mx.example.com;Tue, 17 Mar 2020 08:29:37 +0000"
    );
}

#[test]
fn test_headers_editing() {
    let mut headers = parse(
        "X-My-Testing: 1\nX-My-Second-Test: 1\nX-My-Second-Test: Precisely\nReceived: outpost\nReceived: outpost",
    );
    assert_eq!(headers.len(), 5);

    assert_eq!(headers.remove("X-My-Testing"), 1);
    assert_eq!(headers.len(), 4);
    assert!(!headers.has("X-My-Testing"));

    assert_eq!(headers.remove("received"), 2);
    assert_eq!(headers.len(), 2);

    assert!(headers.remove_header(&Header::new("X-My-Second-Test", "Precisely").unwrap()));
    assert_eq!(headers.len(), 1);
    assert!(headers.has("X-My-Second-Test"));

    let mut extended: Headers = headers.clone();
    extended.push(Header::new("content-type", "application/json").unwrap());
    assert!(extended.has("content-type"));
    assert!(!headers.has("content-type"));
}

#[test]
fn test_options_without_splitting_or_decoding() {
    let options = ParseOptions::new()
        .with_split_entries(false)
        .with_encoded_words(false);
    let headers = parse_with(RAW_HEADERS, &options);

    assert_eq!(headers.len(), 18);
    assert_eq!(headers.to_text(), RAW_HEADERS);
}

//! End-to-end scenarios S1-S6 plus the chunked-framing, size-cap, cron, and
//! rehash-under-load properties from `spec.md` §8, driven over a real
//! `TcpStream` against a `Server` bound on an ephemeral port.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use kvd_server::{Server, ServerConfig};

fn spawn_server(cron_interval_ms: u64) -> SocketAddr {
    let config = ServerConfig {
        port: 0,
        http_addr: None,
        cron_interval_ms,
    };
    let mut server = Server::bind(&config).expect("bind");
    let addr = server.local_addr().expect("local_addr");
    thread::spawn(move || {
        server.run().expect("server loop");
    });
    addr
}

fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    stream
}

fn read_exact_string(stream: &mut TcpStream, len: usize) -> String {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).expect("read_exact");
    String::from_utf8(buf).expect("utf8")
}

#[test]
fn s1_inline_set_then_get() {
    let addr = spawn_server(1000);
    let mut c = connect(addr);
    c.write_all(b"set foo bar\n").unwrap();
    assert_eq!(read_exact_string(&mut c, 5), "+OK\r\n");
    c.write_all(b"get foo\n").unwrap();
    assert_eq!(read_exact_string(&mut c, 10), "$3\r\nbar\r\n");
}

#[test]
fn s2_bulk_set_then_get() {
    let addr = spawn_server(1000);
    let mut c = connect(addr);
    c.write_all(b"*3\r\n$3\r\nset\r\n$1\r\nk\r\n$5\r\nhello\r\n").unwrap();
    assert_eq!(read_exact_string(&mut c, 5), "+OK\r\n");
    c.write_all(b"*2\r\n$3\r\nget\r\n$1\r\nk\r\n").unwrap();
    assert_eq!(read_exact_string(&mut c, 12), "$5\r\nhello\r\n");
}

#[test]
fn s3_expire_zero_then_get_is_nil() {
    let addr = spawn_server(1000);
    let mut c = connect(addr);
    c.write_all(b"set k v\n").unwrap();
    assert_eq!(read_exact_string(&mut c, 5), "+OK\r\n");
    c.write_all(b"expire k 0\n").unwrap();
    assert_eq!(read_exact_string(&mut c, 5), "+OK\r\n");
    c.write_all(b"get k\n").unwrap();
    assert_eq!(read_exact_string(&mut c, 5), "$-1\r\n");
}

#[test]
fn s4_unknown_command_and_wrong_arity() {
    let addr = spawn_server(1000);
    let mut c = connect(addr);
    c.write_all(b"notacmd\n").unwrap();
    assert_eq!(
        read_exact_string(&mut c, "-ERR: unknow command\r\n".len()),
        "-ERR: unknow command\r\n"
    );
    c.write_all(b"set only\n").unwrap();
    assert_eq!(
        read_exact_string(&mut c, "-ERR: wrong number of args\r\n".len()),
        "-ERR: wrong number of args\r\n"
    );
}

#[test]
fn s5_rehash_under_load_all_reads_succeed() {
    let addr = spawn_server(1000);
    let mut c = connect(addr);
    let n = 1000;
    for i in 0..n {
        let cmd = format!("set key-{i} val-{i}\n");
        c.write_all(cmd.as_bytes()).unwrap();
        assert_eq!(read_exact_string(&mut c, 5), "+OK\r\n");
    }
    for i in 0..n {
        let cmd = format!("get key-{i}\n");
        c.write_all(cmd.as_bytes()).unwrap();
        let expected = format!("val-{i}");
        let header = format!("${}\r\n", expected.len());
        let got = read_exact_string(&mut c, header.len() + expected.len() + 2);
        assert_eq!(got, format!("{header}{expected}\r\n"));
    }
}

#[test]
fn s6_quit_closes_without_reply() {
    let addr = spawn_server(1000);
    let mut c = connect(addr);
    c.write_all(b"quit\n").unwrap();
    let mut buf = [0u8; 16];
    let n = c.read(&mut buf).expect("read after quit");
    assert_eq!(n, 0, "expected EOF, got {n} bytes");
}

#[test]
fn framing_split_across_many_small_writes() {
    let addr = spawn_server(1000);
    let mut c = connect(addr);
    let request = b"*3\r\n$3\r\nset\r\n$1\r\nk\r\n$5\r\nhello\r\n";
    for byte in request {
        c.write_all(&[*byte]).unwrap();
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(read_exact_string(&mut c, 5), "+OK\r\n");
}

#[test]
fn oversized_inline_line_closes_the_connection() {
    let addr = spawn_server(1000);
    let mut c = connect(addr);
    let oversized = vec![b'a'; 4097];
    c.write_all(&oversized).unwrap();
    let mut buf = [0u8; 16];
    let n = c.read(&mut buf).expect("read after protocol error");
    assert_eq!(n, 0, "expected connection to be closed");
}

#[test]
fn cron_sweep_expires_keys_without_a_read() {
    let addr = spawn_server(20);
    let mut c = connect(addr);
    c.write_all(b"set k v\n").unwrap();
    assert_eq!(read_exact_string(&mut c, 5), "+OK\r\n");
    c.write_all(b"expire k 0\n").unwrap();
    assert_eq!(read_exact_string(&mut c, 5), "+OK\r\n");

    thread::sleep(Duration::from_millis(200));

    c.write_all(b"get k\n").unwrap();
    assert_eq!(read_exact_string(&mut c, 5), "$-1\r\n");
}

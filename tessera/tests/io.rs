use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;
use tessera::RuntimeBuilder;
use tessera::io;
use tessera::task;
use tessera::time::sleep;

fn nonblocking_pair() -> (UnixStream, UnixStream) {
    let (a, b) = UnixStream::pair().unwrap();
    io::set_nonblocking(a.as_fd()).unwrap();
    io::set_nonblocking(b.as_fd()).unwrap();
    (a, b)
}

#[tessera::test]
async fn read_waits_until_data_arrives() {
    let (mut writer, reader) = nonblocking_pair();

    task::spawn(async move {
        sleep(Duration::from_millis(20)).await;
        writer.write_all(b"hello").unwrap();
    });

    let mut buf = [0u8; 16];
    let n = io::read(reader.as_fd(), &mut buf).await.unwrap();

    assert_eq!(&buf[..n], b"hello");
}

#[tessera::test]
async fn read_returns_zero_at_end_of_stream() {
    let (writer, reader) = nonblocking_pair();

    task::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        drop(writer);
    });

    let mut buf = [0u8; 8];
    assert_eq!(io::read(reader.as_fd(), &mut buf).await.unwrap(), 0);
}

#[tessera::test(worker_threads = 2)]
async fn write_sends_the_whole_buffer_past_the_socket_buffer() {
    const LEN: usize = 1 << 20;
    let (writer, reader) = nonblocking_pair();

    let payload: Vec<u8> = (0..LEN).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let sender = task::spawn(async move {
        io::write(writer.as_fd(), &payload).await.unwrap();
    });

    let mut received = Vec::with_capacity(LEN);
    let mut buf = vec![0u8; 64 * 1024];
    while received.len() < LEN {
        let n = io::read(reader.as_fd(), &mut buf).await.unwrap();
        assert!(n > 0, "stream ended early");
        received.extend_from_slice(&buf[..n]);
    }

    sender.await.unwrap();
    assert_eq!(received, expected);
}

#[tessera::test]
async fn wait_writable_resolves_for_an_idle_socket() {
    let (writer, _reader) = nonblocking_pair();
    io::wait_writable(writer.as_raw_fd()).await.unwrap();
}

#[test]
fn readiness_registrations_are_released() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();
    let (mut writer, reader) = nonblocking_pair();

    let waiting = rt.spawn(async move {
        io::wait_readable(reader.as_raw_fd()).await.unwrap();
        reader
    });

    rt.block_on(sleep(Duration::from_millis(20)));
    assert_eq!(rt.metrics().io_registrations, 1);

    writer.write_all(b"x").unwrap();
    let mut reader = rt.block_on(waiting).unwrap();

    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte).unwrap();
    assert_eq!(&byte, b"x");
    assert_eq!(rt.metrics().io_registrations, 0);
}

#[tessera::test]
async fn connect_then_exchange_bytes() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).unwrap();
        stream.write_all(b"pong").unwrap();
        buf
    });

    let socket = io::connect(addr).await.unwrap();
    io::write(socket.as_fd(), b"ping").await.unwrap();

    let mut reply = [0u8; 4];
    let mut filled = 0;
    while filled < reply.len() {
        let n = io::read(socket.as_fd(), &mut reply[filled..]).await.unwrap();
        assert!(n > 0);
        filled += n;
    }

    assert_eq!(&reply, b"pong");
    assert_eq!(&server.join().unwrap(), b"ping");

    // The descriptor is an ordinary connected socket.
    let stream = TcpStream::from(socket);
    assert_eq!(stream.peer_addr().unwrap(), addr);
}

#[tessera::test]
async fn connect_to_closed_port_fails() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let err = io::connect(addr).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
}
